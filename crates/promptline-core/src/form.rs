//! Transient input forms built from server-sent field specifications.

use crate::error::{FormError, TransportError};
use async_trait::async_trait;
use futures_util::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use promptline_protocol::{EnumOption, EnumSource, FieldKind, FieldSpec, PromptId, PromptMethod};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Submitted form values keyed by field name.
pub type FormPayload = BTreeMap<String, String>;

/// Source of enumerated values for fetch-backed fields.
#[async_trait]
pub trait EnumFetcher: Send + Sync {
    /// Retrieve the options served at `url`.
    async fn fetch_options(&self, url: &str) -> Result<Vec<EnumOption>, TransportError>;
}

/// reqwest-backed enum fetcher expecting a JSON array of options.
#[derive(Debug, Clone, Default)]
pub struct HttpEnumFetcher {
    client: reqwest::Client,
}

impl HttpEnumFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnumFetcher for HttpEnumFetcher {
    async fn fetch_options(&self, url: &str) -> Result<Vec<EnumOption>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| TransportError::Network(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json::<Vec<EnumOption>>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))
    }
}

/// Where a submitted form goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    pub prompt_id: PromptId,
    /// Title shown above the form.
    pub prompt_text: String,
    pub method: PromptMethod,
}

/// Shared inputs for opening forms.
#[derive(Clone)]
pub struct FormOptions {
    /// Options applied by field name when the field declares none.
    pub inline_enums: BTreeMap<String, Vec<EnumOption>>,
    pub fetcher: Arc<dyn EnumFetcher>,
}

impl FormOptions {
    pub fn new(fetcher: Arc<dyn EnumFetcher>) -> Self {
        Self {
            inline_enums: BTreeMap::new(),
            fetcher,
        }
    }

    pub fn with_inline_enums(mut self, inline_enums: BTreeMap<String, Vec<EnumOption>>) -> Self {
        self.inline_enums = inline_enums;
        self
    }
}

/// Current state of one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub spec: FieldSpec,
    pub value: String,
    /// Known enumerated values; may grow while a fetch is outstanding.
    pub options: Vec<EnumOption>,
    /// A fetch for this field's options has not resolved yet.
    pub loading: bool,
}

impl FormField {
    /// Whether the field is a choice among options.
    pub fn is_choice(&self) -> bool {
        self.spec.kind == FieldKind::Enum || !self.options.is_empty() || self.loading
    }

    /// Placeholder shown for an empty value.
    pub fn placeholder(&self) -> String {
        if self.is_choice() && self.spec.kind != FieldKind::Enum && self.spec.placeholder.is_none()
        {
            return format!("Select {}", self.spec.label);
        }
        self.spec.placeholder_text()
    }
}

/// A pending input form.
///
/// Cloning shares the underlying state, so enum fetches spawned at open time
/// keep filling options into every clone, including after submission.
#[derive(Clone)]
pub struct DynamicForm {
    target: FormTarget,
    fields: Arc<Mutex<Vec<FormField>>>,
    fetches: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for DynamicForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicForm")
            .field("target", &self.target)
            .field("fields", &*self.fields.lock())
            .finish()
    }
}

impl DynamicForm {
    /// Open a form with every field set to an empty value.
    ///
    /// Fetch-backed fields start with no options and fill in when their
    /// fetch resolves; the form is usable immediately.
    pub fn open(target: FormTarget, specs: Vec<FieldSpec>, options: &FormOptions) -> Self {
        let mut pending = Vec::new();
        let fields = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                let (choices, fetch_url) = match &spec.enum_source {
                    Some(EnumSource::Inline(choices)) => (choices.clone(), None),
                    _ => match options.inline_enums.get(&spec.name) {
                        Some(choices) => (choices.clone(), None),
                        None => match &spec.enum_source {
                            Some(EnumSource::Fetch(url)) => (Vec::new(), Some(url.clone())),
                            _ => (Vec::new(), None),
                        },
                    },
                };
                let loading = fetch_url.is_some();
                if let Some(url) = fetch_url {
                    pending.push((index, spec.name.clone(), url));
                }
                FormField {
                    spec,
                    value: String::new(),
                    options: choices,
                    loading,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "opened form (prompt_id={}, method={}, fields={}, fetches={})",
            target.prompt_id,
            target.method.as_str(),
            fields.len(),
            pending.len()
        );
        let form = Self {
            target,
            fields: Arc::new(Mutex::new(fields)),
            fetches: Arc::new(Mutex::new(Vec::new())),
        };
        for (index, name, url) in pending {
            form.spawn_fetch(index, name, url, options.fetcher.clone());
        }
        form
    }

    fn spawn_fetch(&self, index: usize, name: String, url: String, fetcher: Arc<dyn EnumFetcher>) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no runtime for enum fetch (field={name}, url={url})");
            if let Some(field) = self.fields.lock().get_mut(index) {
                field.loading = false;
            }
            return;
        };
        let fields = self.fields.clone();
        let handle = runtime.spawn(async move {
            let result = fetcher.fetch_options(&url).await;
            let mut fields = fields.lock();
            let Some(field) = fields.get_mut(index).filter(|field| field.spec.name == name) else {
                return;
            };
            field.loading = false;
            match result {
                Ok(options) => {
                    debug!("enum options loaded (field={name}, count={})", options.len());
                    field.options.extend(options);
                }
                Err(err) => warn!("enum fetch failed (field={name}, url={url}): {err}"),
            }
        });
        self.fetches.lock().push(handle);
    }

    pub fn target(&self) -> &FormTarget {
        &self.target
    }

    /// Whether `other` is a clone of this form rather than a separately opened one.
    pub fn is_same(&self, other: &DynamicForm) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }

    pub fn prompt_id(&self) -> PromptId {
        self.target.prompt_id
    }

    pub fn method(&self) -> PromptMethod {
        self.target.method
    }

    /// Snapshot of every field.
    pub fn fields(&self) -> Vec<FormField> {
        self.fields.lock().clone()
    }

    /// Current value of a field.
    pub fn value(&self, name: &str) -> Option<String> {
        self.fields
            .lock()
            .iter()
            .find(|field| field.spec.name == name)
            .map(|field| field.value.clone())
    }

    /// Set the value of a declared field.
    pub fn set_value(&self, name: &str, value: impl Into<String>) -> Result<(), FormError> {
        let mut fields = self.fields.lock();
        let field = fields
            .iter_mut()
            .find(|field| field.spec.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        field.value = value.into();
        Ok(())
    }

    /// Names of fields that are still empty. Informational only.
    pub fn missing_fields(&self) -> Vec<String> {
        self.fields
            .lock()
            .iter()
            .filter(|field| field.value.trim().is_empty())
            .map(|field| field.spec.name.clone())
            .collect()
    }

    /// Collect the current values.
    pub fn submit(&self) -> FormPayload {
        self.fields
            .lock()
            .iter()
            .map(|field| (field.spec.name.clone(), field.value.clone()))
            .collect()
    }

    /// Wait for every outstanding enum fetch.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.fetches.lock());
        for result in join_all(handles).await {
            if let Err(err) = result {
                warn!("enum fetch task failed: {err}");
            }
        }
    }
}
