//! Conversation session: the top-level owner of one conversation surface.

use crate::error::{SessionError, TransportError};
use crate::form::{DynamicForm, EnumFetcher, FormOptions, FormPayload, FormTarget, HttpEnumFetcher};
use crate::resolver::{FollowupAction, classify};
use crate::selection::SelectionContext;
use crate::transcript::Transcript;
use crate::transport::{
    FreeTextTransport, HttpFreeTextTransport, HttpPromptTransport, PromptRequest, PromptTransport,
    StatusPolicy,
};
use crate::types::{ConversationId, ExtraAction, SessionState, Turn};
use log::{debug, info, warn};
use parking_lot::Mutex;
use promptline_config::{FreeTextMode, PromptlineConfig};
use promptline_protocol::{FollowupOption, PromptId, PromptMethod, PromptReply};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Builder for a [`ConversationSession`].
pub struct SessionBuilder {
    config: PromptlineConfig,
    transport: Option<Arc<dyn PromptTransport>>,
    free_text: Option<Arc<dyn FreeTextTransport>>,
    enum_fetcher: Option<Arc<dyn EnumFetcher>>,
    actor: Option<String>,
}

impl SessionBuilder {
    /// Use a custom prompt transport instead of HTTP.
    pub fn transport(mut self, transport: Arc<dyn PromptTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom free-text transport instead of HTTP.
    pub fn free_text(mut self, free_text: Arc<dyn FreeTextTransport>) -> Self {
        self.free_text = Some(free_text);
        self
    }

    /// Use a custom enum fetcher instead of HTTP.
    pub fn enum_fetcher(mut self, enum_fetcher: Arc<dyn EnumFetcher>) -> Self {
        self.enum_fetcher = Some(enum_fetcher);
        self
    }

    /// Seed the actor id.
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Build the session. Unset collaborators use the HTTP implementations
    /// pointed at the configured backend.
    pub fn build(self) -> ConversationSession {
        let backend = &self.config.backend;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpPromptTransport::from_config(backend)));
        let free_text = self
            .free_text
            .unwrap_or_else(|| Arc::new(HttpFreeTextTransport::from_config(backend)));
        let enum_fetcher = self
            .enum_fetcher
            .unwrap_or_else(|| Arc::new(HttpEnumFetcher::new()));
        let form_options = FormOptions::new(enum_fetcher)
            .with_inline_enums(self.config.forms.inline_enums.clone());
        ConversationSession {
            transport,
            free_text,
            form_options,
            inner: Mutex::new(SessionInner {
                actor: normalize_actor(self.actor),
                ..SessionInner::default()
            }),
            config: self.config,
        }
    }
}

#[derive(Default)]
struct SessionInner {
    state: SessionState,
    conversation_id: Option<ConversationId>,
    actor: Option<String>,
    transcript: Transcript,
    selection: SelectionContext,
    pending_form: Option<DynamicForm>,
    last_query_id: Option<String>,
}

impl SessionInner {
    /// Id of a populated conversation. A surface still waiting for its actor
    /// accepts no turns, since population reseeds the transcript.
    fn populated_conversation(&self) -> Result<ConversationId, SessionError> {
        match (self.state, self.conversation_id) {
            (SessionState::Closed, _) | (_, None) => Err(SessionError::NotOpen),
            (SessionState::Empty, _) => {
                warn!("action skipped: conversation is waiting for an actor id");
                Err(SessionError::MissingActor)
            }
            (SessionState::Populated, Some(conversation_id)) => Ok(conversation_id),
        }
    }

    fn require_actor(&self) -> Result<String, SessionError> {
        self.actor.clone().ok_or_else(|| {
            warn!("action skipped: actor id is not available");
            SessionError::MissingActor
        })
    }

    /// Append a turn unless the conversation it belongs to has been closed.
    fn append(&mut self, turn: Turn) -> bool {
        if self.conversation_id != Some(turn.conversation_id) {
            debug!(
                "dropping turn for stale conversation (conversation_id={})",
                turn.conversation_id
            );
            return false;
        }
        self.transcript.push(turn);
        true
    }
}

/// Owner of one conversation: identity, transcript, selection context and
/// the pending form.
///
/// Every operation takes `&self`; state lives behind a mutex that is never
/// held across a backend call.
pub struct ConversationSession {
    config: PromptlineConfig,
    transport: Arc<dyn PromptTransport>,
    free_text: Arc<dyn FreeTextTransport>,
    form_options: FormOptions,
    inner: Mutex<SessionInner>,
}

impl ConversationSession {
    /// Start building a session for the given config.
    pub fn builder(config: PromptlineConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            transport: None,
            free_text: None,
            enum_fetcher: None,
            actor: None,
        }
    }

    /// Open the surface.
    ///
    /// A closed session gets a fresh conversation id; the root prompt is
    /// requested once an actor id is available. Opening an open session is a
    /// no-op.
    pub async fn open(&self) -> ConversationId {
        let conversation_id = {
            let mut inner = self.inner.lock();
            match (inner.state, inner.conversation_id) {
                (SessionState::Closed, _) | (_, None) => {
                    let conversation_id = Uuid::new_v4();
                    inner.conversation_id = Some(conversation_id);
                    inner.state = SessionState::Empty;
                    info!("opened conversation (conversation_id={conversation_id})");
                    conversation_id
                }
                (_, Some(conversation_id)) => conversation_id,
            }
        };
        self.populate_if_ready().await;
        conversation_id
    }

    /// Close the surface, discarding every piece of conversation state.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Some(conversation_id) = inner.conversation_id {
            info!("closed conversation (conversation_id={conversation_id})");
        }
        let actor = inner.actor.take();
        *inner = SessionInner {
            actor,
            ..SessionInner::default()
        };
    }

    /// Update the actor id, populating a waiting surface when it appears.
    pub async fn set_actor(&self, actor: Option<String>) {
        {
            let mut inner = self.inner.lock();
            let actor = normalize_actor(actor);
            if inner.actor != actor {
                debug!("actor changed (actor_id={:?})", actor);
            }
            inner.actor = actor;
        }
        self.populate_if_ready().await;
    }

    /// Track an identity channel, applying every change with [`Self::set_actor`].
    pub fn follow_identity(
        self: &Arc<Self>,
        mut identity: watch::Receiver<Option<String>>,
    ) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            let initial = identity.borrow_and_update().clone();
            session.set_actor(initial).await;
            while identity.changed().await.is_ok() {
                let actor = identity.borrow_and_update().clone();
                session.set_actor(actor).await;
            }
            debug!("identity channel closed");
        })
    }

    async fn populate_if_ready(&self) {
        let (conversation_id, actor) = {
            let mut inner = self.inner.lock();
            if inner.state != SessionState::Empty {
                return;
            }
            let (Some(conversation_id), Some(actor)) = (inner.conversation_id, inner.actor.clone())
            else {
                debug!("population deferred until an actor id is available");
                return;
            };
            inner.state = SessionState::Populated;
            let welcome = Turn::bot(conversation_id, self.config.conversation.welcome_text.clone());
            inner.transcript.reseed(welcome);
            (conversation_id, actor)
        };
        info!(
            "populating conversation (conversation_id={}, actor_id={})",
            conversation_id, actor
        );
        let request = self.root_request(conversation_id, actor, None);
        let result = self.transport.fetch_prompt(request).await;
        self.append_reply(conversation_id, result);
    }

    /// Record free text typed by the user.
    ///
    /// In local mode this only appends the user turn. In forward mode the
    /// text is also sent to the free-text endpoint and the answer appended;
    /// a failure is appended and returned.
    pub async fn submit_free_text(&self, text: &str) -> Result<(), SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        let conversation_id = {
            let mut inner = self.inner.lock();
            let conversation_id = inner.populated_conversation()?;
            inner.append(Turn::user(conversation_id, text));
            conversation_id
        };
        if self.config.conversation.free_text == FreeTextMode::Local {
            return Ok(());
        }

        let result = self.free_text.send_free_text(text).await;
        let mut inner = self.inner.lock();
        match result {
            Ok(reply) => {
                if inner.append(Turn::bot(conversation_id, reply.display_text()))
                    && let Some(query_id) = reply.query_id()
                {
                    inner.last_query_id = Some(query_id);
                }
                Ok(())
            }
            Err(err) => {
                warn!("free text request failed: {err}");
                inner.append(Turn::bot(conversation_id, err.display_text()));
                Err(err.into())
            }
        }
    }

    /// Select a follow-up using the live selection context.
    pub async fn select_option(&self, option: &FollowupOption) -> Result<(), SessionError> {
        self.select_option_with_context(option, None).await
    }

    /// Select a follow-up, overriding the selection context for this call.
    ///
    /// Failures of the resulting backend call are shown in the transcript,
    /// not returned.
    pub async fn select_option_with_context(
        &self,
        option: &FollowupOption,
        context: Option<i64>,
    ) -> Result<(), SessionError> {
        match classify(option) {
            FollowupAction::ShowForm {
                fields,
                prompt_id,
                prompt_text,
                method,
            } => {
                let mut inner = self.inner.lock();
                let conversation_id = inner.populated_conversation()?;
                inner.append(Turn::user(conversation_id, option.text.clone()));
                let target = FormTarget {
                    prompt_id,
                    prompt_text,
                    method,
                };
                inner.pending_form = Some(DynamicForm::open(target, fields, &self.form_options));
                Ok(())
            }
            FollowupAction::Reset => self.reset(context).await,
            FollowupAction::Dispatch { prompt_id, method } => {
                let request = {
                    let mut inner = self.inner.lock();
                    let conversation_id = inner.populated_conversation()?;
                    let actor = inner.require_actor()?;
                    inner.append(Turn::user(conversation_id, option.text.clone()));
                    PromptRequest::new(prompt_id, conversation_id)
                        .with_actor(actor)
                        .with_context(inner.selection.resolve(context))
                        .with_method(method)
                };
                let conversation_id = request.conversation_id;
                let result = self.transport.fetch_prompt(request).await;
                self.append_reply(conversation_id, result);
                Ok(())
            }
        }
    }

    async fn reset(&self, context: Option<i64>) -> Result<(), SessionError> {
        let request = {
            let mut inner = self.inner.lock();
            let conversation_id = inner.populated_conversation()?;
            let actor = inner.require_actor()?;
            inner.transcript.clear();
            debug!("reset conversation (conversation_id={conversation_id})");
            self.root_request(conversation_id, actor, inner.selection.resolve(context))
        };
        let conversation_id = request.conversation_id;
        let result = self.transport.fetch_prompt(request).await;
        self.append_reply(conversation_id, result);
        Ok(())
    }

    /// Select an entity; later requests carry its id until another is chosen.
    pub fn select_entity(&self, entity_id: i64) {
        self.inner.lock().selection.select(entity_id);
    }

    /// Submit the pending form with the given payload.
    ///
    /// The submitted form is cleared whatever the outcome, unless another
    /// form has replaced it meanwhile. Failures are shown in the transcript;
    /// transport failures are also returned.
    pub async fn submit_form(&self, payload: FormPayload) -> Result<(), SessionError> {
        let (request, form) = {
            let inner = self.inner.lock();
            let conversation_id = inner.populated_conversation()?;
            let form = inner
                .pending_form
                .clone()
                .ok_or(SessionError::NoPendingForm)?;
            let actor = inner.require_actor()?;
            let body = payload
                .into_iter()
                .map(|(name, value)| (name, Value::String(value)))
                .collect::<serde_json::Map<_, _>>();
            let request = PromptRequest::new(form.prompt_id(), conversation_id)
                .with_actor(actor)
                .with_context(inner.selection.resolve(None))
                .with_method(form.method())
                .with_body(Value::Object(body))
                .with_status_policy(StatusPolicy::Strict);
            (request, form)
        };
        info!(
            "submitting form (prompt_id={}, method={})",
            form.prompt_id(),
            form.method().as_str()
        );
        let conversation_id = request.conversation_id;
        let result = self.transport.fetch_prompt(request).await;
        {
            let mut inner = self.inner.lock();
            if inner
                .pending_form
                .as_ref()
                .is_some_and(|pending| pending.is_same(&form))
            {
                inner.pending_form = None;
            }
        }
        match result {
            Ok(reply) => {
                self.append_reply(conversation_id, Ok(reply));
                Ok(())
            }
            Err(err) => {
                self.append_reply(conversation_id, Err(err.clone()));
                if err.is_application() {
                    Ok(())
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// Submit the pending form with its current values.
    pub async fn submit_pending_form(&self) -> Result<(), SessionError> {
        let payload = self
            .pending_form()
            .map(|form| form.submit())
            .ok_or(SessionError::NoPendingForm)?;
        self.submit_form(payload).await
    }

    /// Discard the pending form. Returns whether one was pending.
    pub fn cancel_form(&self) -> bool {
        let cancelled = self.inner.lock().pending_form.take().is_some();
        if cancelled {
            debug!("form cancelled");
        }
        cancelled
    }

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Turn> {
        self.inner.lock().transcript.turns().to_vec()
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.lock().conversation_id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Currently selected entity id.
    pub fn selection(&self) -> Option<i64> {
        self.inner.lock().selection.current()
    }

    pub fn pending_form(&self) -> Option<DynamicForm> {
        self.inner.lock().pending_form.clone()
    }

    pub fn actor(&self) -> Option<String> {
        self.inner.lock().actor.clone()
    }

    /// Query id of the last forwarded free-text answer.
    pub fn last_query_id(&self) -> Option<String> {
        self.inner.lock().last_query_id.clone()
    }

    /// Download link for the last forwarded free-text answer.
    pub fn export_url(&self) -> Option<String> {
        self.last_query_id()
            .map(|query_id| self.config.backend.export_url(&query_id))
    }

    pub fn config(&self) -> &PromptlineConfig {
        &self.config
    }

    fn root_request(
        &self,
        conversation_id: ConversationId,
        actor: String,
        context: Option<i64>,
    ) -> PromptRequest {
        let root: PromptId = self.config.conversation.root_prompt_id;
        PromptRequest::new(root, conversation_id)
            .with_actor(actor)
            .with_context(context)
            .with_method(PromptMethod::Query)
    }

    fn reply_turn(&self, conversation_id: ConversationId, reply: PromptReply) -> Turn {
        let extra_action = reply
            .extra_action
            .map(|value| ExtraAction::classify(value, &self.config.selection));
        Turn::bot(conversation_id, reply.display_text)
            .with_options(reply.followups)
            .with_extra_action(extra_action)
            .with_intent(reply.intent)
    }

    fn append_reply(
        &self,
        conversation_id: ConversationId,
        result: Result<PromptReply, TransportError>,
    ) {
        let turn = match result {
            Ok(reply) => self.reply_turn(conversation_id, reply),
            Err(err) => {
                warn!("prompt request failed (conversation_id={conversation_id}): {err}");
                Turn::bot(conversation_id, err.display_text())
            }
        };
        self.inner.lock().append(turn);
    }
}

fn normalize_actor(actor: Option<String>) -> Option<String> {
    actor
        .map(|actor| actor.trim().to_string())
        .filter(|actor| !actor.is_empty())
}
