//! Conversation session behaviour against a scripted backend.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use promptline_config::{FreeTextMode, PromptlineConfig};
use promptline_core::{
    ConversationSession, ExtraAction, PromptRequest, PromptTransport, SelectableEntity, Sender,
    SessionError, SessionState, StatusPolicy, TransportError, Turn,
};
use promptline_protocol::{
    EnumOption, EnumSource, FieldKind, FieldSpec, FollowupOption, PromptId, PromptMethod,
    PromptReply,
};
use promptline_test_utils::{
    ScriptedTransport, StubEnumFetcher, StubFreeText, entities_reply, text_reply,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Notify, watch};

const WELCOME: &str = "Hello! How can I help you today?";

fn root_reply() -> PromptReply {
    text_reply(
        "Hi",
        vec![
            FollowupOption::query(1, "Check status"),
            FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update),
        ],
    )
}

fn session_with(transport: Arc<ScriptedTransport>, actor: Option<&str>) -> ConversationSession {
    let mut builder = ConversationSession::builder(PromptlineConfig::default())
        .transport(transport)
        .enum_fetcher(Arc::new(StubEnumFetcher::default()));
    if let Some(actor) = actor {
        builder = builder.actor(actor);
    }
    builder.build()
}

fn texts(turns: &[Turn]) -> Vec<String> {
    turns.iter().map(|turn| turn.text.clone()).collect()
}

fn income_option() -> FollowupOption {
    FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update)
}

/// Scripted transport that parks requests for one prompt until released.
struct GatedTransport {
    script: ScriptedTransport,
    gated: PromptId,
    entered: Notify,
    release: Notify,
}

impl GatedTransport {
    fn new(script: ScriptedTransport, gated: PromptId) -> Self {
        Self {
            script,
            gated,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl PromptTransport for GatedTransport {
    async fn fetch_prompt(&self, request: PromptRequest) -> Result<PromptReply, TransportError> {
        if request.prompt_id == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.script.fetch_prompt(request).await
    }
}

/// Opening with an actor requests the root prompt under a fresh conversation.
#[tokio::test]
async fn open_fetches_root_prompt_after_welcome() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));

    let conversation_id = session.open().await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt_id, 0);
    assert_eq!(requests[0].actor_id.as_deref(), Some("u1"));
    assert_eq!(requests[0].conversation_id, conversation_id);
    assert_eq!(requests[0].context, None);
    assert_eq!(requests[0].method, PromptMethod::Query);

    let transcript = session.transcript();
    assert_eq!(texts(&transcript), vec![WELCOME, "Hi"]);
    assert!(transcript.iter().all(|turn| turn.sender == Sender::Bot));
    assert!(
        transcript
            .iter()
            .all(|turn| turn.conversation_id == conversation_id)
    );
    assert_eq!(transcript[1].options[0], FollowupOption::query(1, "Check status"));
    assert_eq!(session.state(), SessionState::Populated);
}

#[tokio::test]
async fn opening_twice_populates_once() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));

    let first = session.open().await;
    let second = session.open().await;
    session.set_actor(Some("u1".to_string())).await;

    assert_eq!(first, second);
    assert_eq!(transport.request_count(), 1);
    assert_eq!(session.transcript().len(), 2);
}

/// Without an actor the surface stays empty until one arrives.
#[tokio::test]
async fn population_waits_for_actor() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), None);

    session.open().await;
    assert_eq!(session.state(), SessionState::Empty);
    assert!(session.transcript().is_empty());
    assert_eq!(transport.request_count(), 0);

    session.set_actor(Some("   ".to_string())).await;
    assert_eq!(transport.request_count(), 0);

    session.set_actor(Some("u1".to_string())).await;
    assert_eq!(session.state(), SessionState::Populated);
    assert_eq!(texts(&session.transcript()), vec![WELCOME, "Hi"]);

    session.set_actor(Some("u2".to_string())).await;
    assert_eq!(transport.request_count(), 1);
}

/// Turns cannot be added while the surface waits for its actor, so the
/// welcome reseed never discards anything.
#[tokio::test]
async fn actions_before_actor_leave_transcript_untouched() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), None);
    session.open().await;

    assert_eq!(
        session.submit_free_text("hello").await,
        Err(SessionError::MissingActor)
    );
    assert_eq!(
        session.select_option(&income_option()).await,
        Err(SessionError::MissingActor)
    );
    assert_eq!(
        session.select_option(&FollowupOption::back("Back")).await,
        Err(SessionError::MissingActor)
    );
    assert!(session.transcript().is_empty());
    assert!(session.pending_form().is_none());
    assert_eq!(transport.request_count(), 0);

    session.set_actor(Some("u1".to_string())).await;
    let populated = session.transcript();
    assert_eq!(texts(&populated), vec![WELCOME, "Hi"]);

    session.submit_free_text("hello").await.expect("text");
    let transcript = session.transcript();
    assert_eq!(texts(&transcript), vec![WELCOME, "Hi", "hello"]);
    assert_eq!(&transcript[..2], populated.as_slice());
}

#[tokio::test]
async fn identity_channel_drives_deferred_population() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = Arc::new(session_with(transport.clone(), None));
    let (identity, receiver) = watch::channel(None);

    session.open().await;
    let follower = session.follow_identity(receiver);
    identity.send(Some("u1".to_string())).expect("send");
    drop(identity);
    follower.await.expect("follower");

    assert_eq!(session.actor().as_deref(), Some("u1"));
    assert_eq!(transport.request_count(), 1);
    assert_eq!(session.transcript().len(), 2);
}

/// An update option opens a form without touching the network.
#[tokio::test]
async fn update_option_opens_form_without_request() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));
    session.open().await;

    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("select");

    assert_eq!(transport.request_count(), 1);
    let last = session.transcript().last().cloned().expect("turn");
    assert_eq!(last.sender, Sender::User);
    assert_eq!(last.text, "Update[income]");
    let form = session.pending_form().expect("form");
    let names = form
        .fields()
        .into_iter()
        .map(|field| field.spec.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["income"]);
    assert_eq!(form.prompt_id(), 2);
    assert_eq!(form.target().prompt_text, "Update");
}

#[tokio::test]
async fn create_option_uses_explicit_fields() {
    let transport = Arc::new(ScriptedTransport::new());
    let session = session_with(transport, Some("u1"));
    session.open().await;

    let option = FollowupOption::query(4, "Apply")
        .with_method(PromptMethod::Create)
        .with_fields(vec![FieldSpec::text("amount"), FieldSpec::text("tenure")]);
    session.select_option(&option).await.expect("select");

    let fields = session.pending_form().expect("form").fields();
    assert_eq!(
        fields.into_iter().map(|field| field.spec).collect::<Vec<_>>(),
        vec![FieldSpec::text("amount"), FieldSpec::text("tenure")]
    );
}

/// A non-success status on submission is shown, returned, and clears the form.
#[tokio::test]
async fn failed_form_submission_shows_server_error() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_reply(0, root_reply())
            .with_failure(2, TransportError::Status(500)),
    );
    let session = session_with(transport.clone(), Some("u1"));
    let conversation_id = session.open().await;
    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("select");

    let form = session.pending_form().expect("form");
    form.set_value("income", "5000").expect("value");
    let err = session.submit_pending_form().await.unwrap_err();

    assert_eq!(err, SessionError::Transport(TransportError::Status(500)));
    assert!(session.pending_form().is_none());
    let last = session.transcript().last().cloned().expect("turn");
    assert_eq!(last.sender, Sender::Bot);
    assert_eq!(last.text, "Server error: 500");

    let request = transport.last_request().expect("request");
    assert_eq!(request.prompt_id, 2);
    assert_eq!(request.actor_id.as_deref(), Some("u1"));
    assert_eq!(request.conversation_id, conversation_id);
    assert_eq!(request.context, None);
    assert_eq!(request.method, PromptMethod::Update);
    assert_eq!(request.body, Some(json!({ "income": "5000" })));
    assert_eq!(request.status_policy, StatusPolicy::Strict);
}

#[tokio::test]
async fn application_failure_on_submit_is_shown_not_returned() {
    let transport = Arc::new(ScriptedTransport::new().with_failure(
        2,
        TransportError::Application("income: must be numeric".to_string()),
    ));
    let session = session_with(transport, Some("u1"));
    session.open().await;
    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("select");

    session
        .submit_form([("income".to_string(), "abc".to_string())].into())
        .await
        .expect("application failures are displayed only");

    assert!(session.pending_form().is_none());
    assert_eq!(
        session.transcript().last().map(|turn| turn.text.clone()),
        Some("income: must be numeric".to_string())
    );
}

#[tokio::test]
async fn successful_submission_appends_reply() {
    let transport = Arc::new(
        ScriptedTransport::new().with_reply(2, PromptReply::text("Income updated")),
    );
    let session = session_with(transport, Some("u1"));
    session.open().await;
    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("select");
    session.submit_pending_form().await.expect("submit");

    assert!(session.pending_form().is_none());
    assert_eq!(
        session.transcript().last().map(|turn| turn.text.clone()),
        Some("Income updated".to_string())
    );
}

/// A submission that completes after a newer form was opened leaves the
/// newer form pending.
#[tokio::test]
async fn in_flight_submission_keeps_newer_form() {
    let transport = Arc::new(GatedTransport::new(
        ScriptedTransport::new()
            .with_reply(0, root_reply())
            .with_reply(2, PromptReply::text("Income updated")),
        2,
    ));
    let session = Arc::new(
        ConversationSession::builder(PromptlineConfig::default())
            .transport(transport.clone())
            .enum_fetcher(Arc::new(StubEnumFetcher::default()))
            .actor("u1")
            .build(),
    );
    session.open().await;
    session.select_option(&income_option()).await.expect("first form");

    let submission = tokio::spawn({
        let session = session.clone();
        async move { session.submit_pending_form().await }
    });
    transport.entered.notified().await;

    let city = FollowupOption::query(3, "Update[city]").with_method(PromptMethod::Update);
    session.select_option(&city).await.expect("second form");
    transport.release.notify_one();
    submission.await.expect("join").expect("submit");

    assert_eq!(session.pending_form().map(|form| form.prompt_id()), Some(3));
    assert_eq!(
        session.transcript().last().map(|turn| turn.text.clone()),
        Some("Income updated".to_string())
    );
}

/// Fetch-backed fields of a form opened by a selection load their options.
#[tokio::test]
async fn form_fields_fetch_enum_options() {
    let fetcher = Arc::new(StubEnumFetcher::default().with_options(
        "http://enums/branches",
        vec![EnumOption::plain("north"), EnumOption::plain("south")],
    ));
    let session = ConversationSession::builder(PromptlineConfig::default())
        .transport(Arc::new(ScriptedTransport::new()))
        .enum_fetcher(fetcher.clone())
        .actor("u1")
        .build();
    session.open().await;

    let branch = FieldSpec::text("branch")
        .with_kind(FieldKind::Enum)
        .with_enum_source(EnumSource::Fetch("http://enums/branches".to_string()));
    let option = FollowupOption::query(8, "Transfer")
        .with_method(PromptMethod::Create)
        .with_fields(vec![branch, FieldSpec::text("reason")]);
    session.select_option(&option).await.expect("form");

    let form = session.pending_form().expect("form");
    form.settle().await;
    assert_eq!(fetcher.fetched(), vec!["http://enums/branches"]);
    let fields = form.fields();
    assert_eq!(
        fields[0]
            .options
            .iter()
            .map(|option| option.value.as_str())
            .collect::<Vec<_>>(),
        vec!["north", "south"]
    );
    assert!(fields[1].options.is_empty());
}

#[tokio::test]
async fn submit_without_pending_form_is_rejected() {
    let session = session_with(Arc::new(ScriptedTransport::new()), Some("u1"));
    session.open().await;
    assert_eq!(
        session.submit_pending_form().await,
        Err(SessionError::NoPendingForm)
    );
}

#[tokio::test]
async fn cancel_form_leaves_transcript_untouched() {
    let session = session_with(Arc::new(ScriptedTransport::new()), Some("u1"));
    session.open().await;
    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("select");
    let before = session.transcript();

    assert!(session.cancel_form());
    assert!(!session.cancel_form());
    assert!(session.pending_form().is_none());
    assert_eq!(session.transcript(), before);
}

/// A live selection is attached to later dispatches and submissions; a
/// reset keeps it because resets only clear the transcript.
#[tokio::test]
async fn selection_context_threads_through_requests_and_survives_reset() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_reply(0, root_reply())
            .with_reply(5, entities_reply("Pick a loan", &[(7, "Home Loan")])),
    );
    let session = session_with(transport.clone(), Some("u1"));
    session.open().await;

    session
        .select_option(&FollowupOption::query(5, "My loans"))
        .await
        .expect("loans");
    let loans = session.transcript().last().cloned().expect("turn");
    assert_eq!(
        loans.entities(),
        &[SelectableEntity {
            id: 7,
            label: "Home Loan".to_string()
        }]
    );

    session.select_entity(7);
    session.select_entity(7);
    session
        .select_option(&FollowupOption::query(1, "Check status"))
        .await
        .expect("dispatch");
    assert_eq!(transport.last_request().expect("request").context, Some(7));

    session
        .select_option_with_context(&FollowupOption::query(1, "Check status"), Some(3))
        .await
        .expect("override");
    assert_eq!(transport.last_request().expect("request").context, Some(3));

    session
        .select_option(&FollowupOption::back("Back"))
        .await
        .expect("reset");
    assert_eq!(session.selection(), Some(7));
    assert_eq!(transport.last_request().expect("request").context, Some(7));

    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("form");
    session.submit_pending_form().await.expect("submit");
    assert_eq!(transport.last_request().expect("request").context, Some(7));
}

/// Choosing another entity replaces the context of later requests.
#[tokio::test]
async fn selecting_another_entity_replaces_context() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));
    session.open().await;
    let status = FollowupOption::query(1, "Check status");

    session.select_entity(7);
    session.select_option(&status).await.expect("first dispatch");
    session.select_entity(9);
    session.select_option(&status).await.expect("second dispatch");

    let contexts = transport
        .requests()
        .into_iter()
        .filter(|request| request.prompt_id == 1)
        .map(|request| request.context)
        .collect::<Vec<_>>();
    assert_eq!(contexts, vec![Some(7), Some(9)]);
    assert_eq!(session.selection(), Some(9));
}

/// Any number of back actions leaves exactly the root prompt.
#[tokio::test]
async fn repeated_reset_yields_single_root_turn() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));
    session.open().await;
    session.select_entity(11);
    session
        .select_option(&FollowupOption::query(1, "Check status"))
        .await
        .expect("dispatch");

    for _ in 0..3 {
        session
            .select_option(&FollowupOption::back("← Back to Main Menu"))
            .await
            .expect("reset");
        let transcript = session.transcript();
        assert_eq!(texts(&transcript), vec!["Hi"]);
        assert_eq!(transcript[0].sender, Sender::Bot);
        assert_eq!(session.selection(), Some(11));
    }
    let root_requests = transport
        .requests()
        .into_iter()
        .filter(|request| request.prompt_id == 0)
        .count();
    assert_eq!(root_requests, 4);
}

/// Non-reset actions never change earlier turns.
#[tokio::test]
async fn transcript_is_append_only_for_non_reset_actions() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_reply(0, root_reply())
            .with_reply(1, PromptReply::text("Status: active"))
            .with_failure(3, TransportError::Network("connection refused".to_string())),
    );
    let session = session_with(transport, Some("u1"));
    session.open().await;

    let mut previous = session.transcript();
    for step in 0..5 {
        match step {
            0 => session
                .select_option(&FollowupOption::query(1, "Check status"))
                .await
                .expect("dispatch"),
            1 => session.submit_free_text("what is my emi?").await.expect("text"),
            2 => session
                .select_option(&FollowupOption::query(3, "Broken"))
                .await
                .expect("failure is displayed"),
            3 => session.select_entity(4),
            _ => session
                .select_option(
                    &FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update),
                )
                .await
                .expect("form"),
        }
        let current = session.transcript();
        assert!(current.len() >= previous.len());
        for (before, after) in previous.iter().zip(current.iter()) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.text, after.text);
        }
        previous = current;
    }
    assert!(
        previous
            .iter()
            .any(|turn| turn.text == "Unable to reach the assistant: network error: connection refused")
    );
}

/// Missing actor aborts before any request or turn.
#[tokio::test]
async fn dispatch_without_actor_is_a_silent_precondition_failure() {
    let transport = Arc::new(ScriptedTransport::new());
    let session = session_with(transport.clone(), None);
    session.open().await;

    let result = session
        .select_option(&FollowupOption::query(1, "Check status"))
        .await;
    assert_eq!(result, Err(SessionError::MissingActor));
    assert!(session.transcript().is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn actions_on_closed_session_are_rejected() {
    let session = session_with(Arc::new(ScriptedTransport::new()), Some("u1"));
    assert_eq!(
        session.submit_free_text("hello").await,
        Err(SessionError::NotOpen)
    );
    assert_eq!(
        session
            .select_option(&FollowupOption::query(1, "Check status"))
            .await,
        Err(SessionError::NotOpen)
    );
}

#[tokio::test]
async fn details_extra_action_is_kept_as_details() {
    let reply = PromptReply {
        extra_action: Some(json!({ "emi": 1200 })),
        ..PromptReply::text("Your EMI")
    };
    let transport = Arc::new(ScriptedTransport::new().with_reply(6, reply));
    let session = session_with(transport, Some("u1"));
    session.open().await;
    session
        .select_option(&FollowupOption::query(6, "EMI"))
        .await
        .expect("dispatch");

    let last = session.transcript().last().cloned().expect("turn");
    assert_eq!(last.extra_action, Some(ExtraAction::Details(json!({ "emi": 1200 }))));
    assert!(last.entities().is_empty());
}

#[tokio::test]
async fn close_discards_state_and_reopen_starts_fresh() {
    let transport = Arc::new(ScriptedTransport::new().with_reply(0, root_reply()));
    let session = session_with(transport.clone(), Some("u1"));
    let first = session.open().await;
    session.select_entity(7);
    let option = FollowupOption::query(2, "Update[income]").with_method(PromptMethod::Update);
    session.select_option(&option).await.expect("form");

    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.conversation_id(), None);
    assert!(session.transcript().is_empty());
    assert!(session.pending_form().is_none());
    assert_eq!(session.selection(), None);
    assert_eq!(session.actor().as_deref(), Some("u1"));

    let second = session.open().await;
    assert_ne!(first, second);
    assert_eq!(texts(&session.transcript()), vec![WELCOME, "Hi"]);
    assert_eq!(transport.last_request().expect("request").conversation_id, second);
}

#[tokio::test]
async fn free_text_is_local_by_default() {
    let free_text = Arc::new(StubFreeText::answering("unused", None));
    let session = ConversationSession::builder(PromptlineConfig::default())
        .transport(Arc::new(ScriptedTransport::new()))
        .free_text(free_text.clone())
        .actor("u1")
        .build();
    session.open().await;
    let before = session.transcript().len();

    session.submit_free_text("  ").await.expect("blank");
    session.submit_free_text("hello there").await.expect("text");

    let transcript = session.transcript();
    assert_eq!(transcript.len(), before + 1);
    assert_eq!(transcript[before].sender, Sender::User);
    assert_eq!(transcript[before].text, "hello there");
    assert!(free_text.sent().is_empty());
}

#[tokio::test]
async fn forwarded_free_text_appends_answer_and_export_link() {
    let mut config = PromptlineConfig::default();
    config.conversation.free_text = FreeTextMode::Forward;
    let free_text = Arc::new(StubFreeText::answering("Your EMI is 1200", Some(42)));
    let session = ConversationSession::builder(config)
        .transport(Arc::new(ScriptedTransport::new()))
        .free_text(free_text.clone())
        .actor("u1")
        .build();
    session.open().await;

    session.submit_free_text("emi?").await.expect("forward");

    assert_eq!(free_text.sent(), vec!["emi?"]);
    let transcript = session.transcript();
    let tail = &transcript[transcript.len() - 2..];
    assert_eq!(texts(tail), vec!["emi?", "Your EMI is 1200"]);
    assert_eq!(session.last_query_id().as_deref(), Some("42"));
    assert_eq!(
        session.export_url().as_deref(),
        Some("http://localhost:8080/download/42")
    );
}

#[tokio::test]
async fn forwarded_free_text_failure_is_shown_and_returned() {
    let mut config = PromptlineConfig::default();
    config.conversation.free_text = FreeTextMode::Forward;
    let session = ConversationSession::builder(config)
        .transport(Arc::new(ScriptedTransport::new()))
        .free_text(Arc::new(StubFreeText::failing(TransportError::Status(502))))
        .actor("u1")
        .build();
    session.open().await;

    let err = session.submit_free_text("emi?").await.unwrap_err();
    assert_eq!(err, SessionError::Transport(TransportError::Status(502)));
    assert_eq!(
        session.transcript().last().map(|turn| turn.text.clone()),
        Some("Server error: 502".to_string())
    );
    assert_eq!(session.export_url(), None);
}
