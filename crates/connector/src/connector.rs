use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use {
    chrono::Utc,
    futures::FutureExt,
    switchboard_common::Message,
    switchboard_schema::{Capabilities, ChannelSchema, ConnectionSettings, ValidationFailure},
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use {
    crate::telemetry,
    metrics::{counter, histogram},
};

use crate::{
    config::ConnectorConfig,
    error::{ConnectorError, ConnectorResult, ErrorCode},
    provider::{BatchSender, ChannelProvider},
    state::{ConnectorState, StateCell},
    types::{
        BatchItemResult, BatchSendResult, ConnectorHealth, MessageSource, ProviderHealth,
        ReceiveResult, SendResult, StatusUpdate,
    },
};

/// A provider bound to a schema, with lifecycle and dispatch gating.
///
/// Every operation other than `initialize` and `dispose` checks, in order:
/// not disposed, `Connected`, the schema declares the capability, the input
/// validates. Only then is the provider called, under the caller's
/// cancellation token, the connector's own shutdown token and the configured
/// timeout. A provider panic is caught and reported as `PROVIDER_ERROR`.
pub struct Connector {
    schema: Arc<ChannelSchema>,
    provider: Arc<dyn ChannelProvider>,
    config: ConnectorConfig,
    lifecycle: StateCell,
    shutdown: CancellationToken,
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("schema", &self.schema.logical_identity())
            .field("provider", &self.provider.name())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Connector {
    pub fn new(schema: Arc<ChannelSchema>, provider: Arc<dyn ChannelProvider>) -> Self {
        Self {
            schema,
            provider,
            config: ConnectorConfig::default(),
            lifecycle: StateCell::new(),
            shutdown: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &ChannelSchema {
        &self.schema
    }

    pub fn shared_schema(&self) -> Arc<ChannelSchema> {
        Arc::clone(&self.schema)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectorState {
        self.lifecycle.current()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectorState::Connected
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Validate `settings` against the schema and connect the provider.
    ///
    /// Allowed from `Uninitialized`, `Disconnected` and `Error`. Concurrent
    /// callers race for the `Initializing` state; losers get
    /// `INVALID_STATE` without touching the provider.
    pub async fn initialize(
        &self,
        settings: &ConnectionSettings,
        cancel: &CancellationToken,
    ) -> ConnectorResult<()> {
        const OP: &str = "initialize";
        let previous = self
            .lifecycle
            .begin_initialize()
            .map_err(|err| self.reject(OP, err))?;

        let settings = settings.bound_to(Arc::clone(&self.schema));
        debug!(
            provider = self.provider.name(),
            schema = %self.schema.logical_identity(),
            from = %previous,
            settings = ?settings.redacted(),
            "initializing connector"
        );

        let failures = settings.validate();
        if !failures.is_empty() {
            let err = ConnectorError::validation("connection settings", failures);
            self.lifecycle.fail(ConnectorState::Initializing, err.message.clone());
            return Err(self.reject(OP, err));
        }

        if let Err(err) = self
            .dispatch(OP, cancel, self.provider.initialize(&settings, cancel))
            .await
        {
            self.lifecycle.fail(ConnectorState::Initializing, err.to_string());
            return Err(err);
        }

        match self
            .lifecycle
            .compare_and_set(ConnectorState::Initializing, ConnectorState::Connected)
        {
            Ok(()) => {
                info!(
                    provider = self.provider.name(),
                    schema = %self.schema.logical_identity(),
                    "connector initialized"
                );
                Ok(())
            },
            Err(ConnectorState::Disposed) => Err(ConnectorError::disposed(OP)),
            Err(state) => Err(ConnectorError::invalid_state(OP, state)),
        }
    }

    /// Ask the provider to verify its connection.
    pub async fn test_connection(&self, cancel: &CancellationToken) -> ConnectorResult<()> {
        const OP: &str = "test_connection";
        self.ensure_ready(OP, Capabilities::NONE)?;
        let result = self
            .dispatch(OP, cancel, self.provider.test_connection(cancel))
            .await;
        if let Err(err) = &result {
            self.lifecycle.record_error(err.to_string());
        }
        result
    }

    /// Move from `Connected` to `Disconnected` and release the provider.
    /// New operations are rejected as soon as the state changes, even while
    /// the provider is still disconnecting.
    pub async fn disconnect(&self, cancel: &CancellationToken) -> ConnectorResult<()> {
        const OP: &str = "disconnect";
        if let Err(state) = self
            .lifecycle
            .compare_and_set(ConnectorState::Connected, ConnectorState::Disconnected)
        {
            let err = match state {
                ConnectorState::Disposed => ConnectorError::disposed(OP),
                state => ConnectorError::not_initialized(OP, state),
            };
            return Err(self.reject(OP, err));
        }

        let result = self.dispatch(OP, cancel, self.provider.disconnect()).await;
        match &result {
            Ok(()) => info!(provider = self.provider.name(), "connector disconnected"),
            Err(err) => self.lifecycle.record_error(err.to_string()),
        }
        result
    }

    /// Enter the terminal `Disposed` state.
    ///
    /// In-flight provider calls are abandoned and report `DISPOSED`. A
    /// provider that was connected (or connecting) is asked to disconnect.
    /// Calling this more than once is a no-op.
    pub async fn dispose(&self) {
        let previous = self.lifecycle.dispose();
        if previous == ConnectorState::Disposed {
            return;
        }
        self.shutdown.cancel();
        if matches!(
            previous,
            ConnectorState::Connected | ConnectorState::Initializing
        ) {
            self.release_provider().await;
        }
        info!(
            provider = self.provider.name(),
            schema = %self.schema.logical_identity(),
            from = %previous,
            "connector disposed"
        );
    }

    async fn release_provider(&self) {
        let call = AssertUnwindSafe(self.provider.disconnect()).catch_unwind();
        match within(self.config.operation_timeout(), call).await {
            Some(Ok(Ok(()))) => {},
            Some(Ok(Err(err))) => {
                warn!(
                    provider = self.provider.name(),
                    error = %err,
                    "provider disconnect failed during dispose"
                );
            },
            Some(Err(panic)) => {
                warn!(
                    provider = self.provider.name(),
                    panic = panic_message(panic.as_ref()),
                    "provider panicked during dispose"
                );
            },
            None => warn!(
                provider = self.provider.name(),
                "provider disconnect timed out during dispose"
            ),
        }
    }

    // ── Messaging ───────────────────────────────────────────────────────

    pub async fn send_message(
        &self,
        message: &Message,
        cancel: &CancellationToken,
    ) -> ConnectorResult<SendResult> {
        const OP: &str = "send_message";
        self.ensure_ready(OP, Capabilities::SEND_MESSAGES)?;
        self.ensure_valid(OP, message)?;
        let sent = self
            .dispatch(OP, cancel, self.provider.send(message, cancel))
            .await?;
        debug!(
            provider = self.provider.name(),
            message_id = %message.id,
            status = ?sent.status,
            "message sent"
        );
        Ok(sent)
    }

    /// Send several messages, reporting one outcome per message in input
    /// order. A failing message never aborts the rest.
    ///
    /// The provider's [`BatchSender`] is used only when the schema declares
    /// `BulkMessaging`; otherwise each message goes through
    /// [`send_message`](Self::send_message).
    pub async fn send_messages(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> ConnectorResult<BatchSendResult> {
        const OP: &str = "send_messages";
        self.ensure_ready(OP, Capabilities::SEND_MESSAGES)?;

        let native = self
            .schema
            .has_capability(Capabilities::BULK_MESSAGING)
            .then(|| self.provider.batch())
            .flatten();

        let items = match native {
            Some(sender) => self.send_native_batch(sender, messages, cancel).await,
            None => {
                let mut items = Vec::with_capacity(messages.len());
                for message in messages {
                    items.push(BatchItemResult {
                        message_id: message.id.clone(),
                        outcome: self.send_message(message, cancel).await,
                    });
                }
                items
            },
        };

        let batch = BatchSendResult::new(items);
        info!(
            provider = self.provider.name(),
            batch_id = %batch.batch_id,
            total = batch.len(),
            failed = batch.failures().count(),
            native = native.is_some(),
            "batch send finished"
        );
        Ok(batch)
    }

    async fn send_native_batch(
        &self,
        sender: &dyn BatchSender,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Vec<BatchItemResult> {
        const OP: &str = "send_messages";
        let mut outcomes: Vec<Option<ConnectorResult<SendResult>>> = messages
            .iter()
            .map(|message| self.ensure_valid(OP, message).err().map(Err))
            .collect();
        let pending: Vec<usize> = outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.is_none().then_some(index))
            .collect();

        for chunk in pending.chunks(self.config.batch_chunk_size()) {
            let refs: Vec<&Message> = chunk.iter().map(|&index| &messages[index]).collect();
            #[cfg(feature = "metrics")]
            counter!(
                telemetry::BATCH_MESSAGES_TOTAL,
                "provider" => self.provider.name().to_string()
            )
            .increment(refs.len() as u64);

            match self
                .dispatch(OP, cancel, sender.send_batch(&refs, cancel))
                .await
            {
                Ok(results) => {
                    let mut results = results.into_iter();
                    for &index in chunk {
                        outcomes[index] = Some(match results.next() {
                            Some(Ok(sent)) => Ok(sent),
                            Some(Err(err)) => Err(ConnectorError::from_provider(OP, err)),
                            None => Err(ConnectorError::new(
                                ErrorCode::ProviderError,
                                format!("no result returned for message '{}'", messages[index].id),
                            )),
                        });
                    }
                },
                Err(err) => {
                    for &index in chunk {
                        outcomes[index] = Some(Err(err.replicate()));
                    }
                },
            }
        }

        messages
            .iter()
            .zip(outcomes)
            .map(|(message, outcome)| BatchItemResult {
                message_id: message.id.clone(),
                outcome: outcome.unwrap_or_else(|| {
                    Err(ConnectorError::new(
                        ErrorCode::ProviderError,
                        "message was not dispatched",
                    ))
                }),
            })
            .collect()
    }

    pub async fn get_message_status(
        &self,
        message_id: &str,
        cancel: &CancellationToken,
    ) -> ConnectorResult<StatusUpdate> {
        const OP: &str = "get_message_status";
        self.ensure_ready(OP, Capabilities::MESSAGE_STATUS_QUERY)?;
        if message_id.trim().is_empty() {
            let failure = ValidationFailure::for_member("Message id is required", "Id");
            return Err(self.reject(OP, ConnectorError::validation("status query", vec![failure])));
        }
        let query = self
            .provider
            .status_query()
            .ok_or_else(|| self.reject(OP, ConnectorError::unsupported_by_provider(OP)))?;
        self.dispatch(OP, cancel, query.query_status(message_id, cancel))
            .await
    }

    /// Parse an inbound payload (e.g. a webhook body) into messages.
    pub async fn receive_messages(
        &self,
        source: &MessageSource,
        cancel: &CancellationToken,
    ) -> ConnectorResult<ReceiveResult> {
        const OP: &str = "receive_messages";
        self.ensure_ready(OP, Capabilities::RECEIVE_MESSAGES)?;
        let inbound = self
            .provider
            .inbound()
            .ok_or_else(|| self.reject(OP, ConnectorError::unsupported_by_provider(OP)))?;
        let messages = self
            .dispatch(OP, cancel, inbound.receive(source, cancel))
            .await?;
        let received = ReceiveResult::new(messages);
        debug!(
            provider = self.provider.name(),
            batch_id = %received.batch_id,
            count = received.messages.len(),
            "messages received"
        );
        Ok(received)
    }

    /// Parse an inbound delivery status callback.
    pub async fn receive_message_status(
        &self,
        source: &MessageSource,
        cancel: &CancellationToken,
    ) -> ConnectorResult<StatusUpdate> {
        const OP: &str = "receive_message_status";
        self.ensure_ready(OP, Capabilities::HANDLE_MESSAGE_STATE)?;
        let inbound = self
            .provider
            .inbound()
            .ok_or_else(|| self.reject(OP, ConnectorError::unsupported_by_provider(OP)))?;
        self.dispatch(OP, cancel, inbound.receive_status(source, cancel))
            .await
    }

    /// Health of the connector. A failing provider probe is reported as an
    /// unhealthy result rather than an error; cancellation is still an error.
    pub async fn get_health(&self, cancel: &CancellationToken) -> ConnectorResult<ConnectorHealth> {
        const OP: &str = "get_health";
        self.ensure_ready(OP, Capabilities::HEALTH_CHECK)?;
        let probe = match self.provider.health() {
            Some(probe) => match self.dispatch(OP, cancel, probe.probe(cancel)).await {
                Ok(health) => health,
                Err(err)
                    if err.is_cancellation() || err.code == ErrorCode::Disposed =>
                {
                    return Err(err);
                },
                Err(err) => ProviderHealth::unhealthy(err.message),
            },
            None => ProviderHealth::healthy(),
        };

        let lifecycle = self.lifecycle.snapshot();
        let mut issues = probe.issues;
        if lifecycle.state != ConnectorState::Connected {
            issues.push(format!("connector is {}", lifecycle.state));
        }
        let mut details = probe.details;
        if let Some(last_error) = &lifecycle.last_error {
            details.insert("last_error".into(), last_error.clone().into());
        }
        Ok(ConnectorHealth {
            state: lifecycle.state,
            is_healthy: probe.is_healthy && lifecycle.state == ConnectorState::Connected,
            last_checked: Utc::now(),
            state_changed_at: lifecycle.changed_at,
            uptime: lifecycle.uptime(),
            issues,
            details,
        })
    }

    // ── Gates ───────────────────────────────────────────────────────────

    fn ensure_ready(&self, operation: &'static str, required: Capabilities) -> ConnectorResult<()> {
        match self.lifecycle.current() {
            ConnectorState::Connected => {},
            ConnectorState::Disposed => {
                return Err(self.reject(operation, ConnectorError::disposed(operation)));
            },
            state => {
                let err = ConnectorError::not_initialized(operation, state);
                return Err(self.reject(operation, err));
            },
        }
        if !required.is_empty() && !self.schema.has_capability(required) {
            return Err(self.reject(operation, ConnectorError::not_supported(operation, required)));
        }
        Ok(())
    }

    fn ensure_valid(&self, operation: &'static str, message: &Message) -> ConnectorResult<()> {
        let failures: Vec<ValidationFailure> = self.schema.validate_message(message).collect();
        if failures.is_empty() {
            return Ok(());
        }
        Err(self.reject(operation, ConnectorError::validation("message", failures)))
    }

    fn reject(&self, operation: &'static str, err: ConnectorError) -> ConnectorError {
        debug!(
            provider = self.provider.name(),
            operation,
            code = %err.code,
            reason = %err.message,
            "operation rejected"
        );
        #[cfg(feature = "metrics")]
        counter!(
            telemetry::REJECTIONS_TOTAL,
            "provider" => self.provider.name().to_string(),
            "operation" => operation,
            "code" => err.code.as_str()
        )
        .increment(1);
        err
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    async fn dispatch<T>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> ConnectorResult<T> {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();

        let result = self.guarded(operation, cancel, call).await;
        if let Err(err) = &result {
            warn!(
                provider = self.provider.name(),
                operation,
                code = %err.code,
                error = %err.message,
                "provider call failed"
            );
        }

        #[cfg(feature = "metrics")]
        {
            let outcome = match &result {
                Ok(_) => "ok",
                Err(err) => err.code.as_str(),
            };
            counter!(
                telemetry::OPERATIONS_TOTAL,
                "provider" => self.provider.name().to_string(),
                "operation" => operation,
                "outcome" => outcome
            )
            .increment(1);
            histogram!(
                telemetry::OPERATION_DURATION_SECONDS,
                "provider" => self.provider.name().to_string(),
                "operation" => operation
            )
            .record(started.elapsed().as_secs_f64());
        }
        result
    }

    async fn guarded<T>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> ConnectorResult<T> {
        if cancel.is_cancelled() {
            return Err(ConnectorError::cancelled(operation));
        }
        if self.shutdown.is_cancelled() {
            return Err(ConnectorError::disposed(operation));
        }

        let timeout = self.config.operation_timeout();
        let call = AssertUnwindSafe(call).catch_unwind();
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ConnectorError::cancelled(operation)),
            () = self.shutdown.cancelled() => return Err(ConnectorError::disposed(operation)),
            outcome = within(timeout, call) => outcome,
        };

        match outcome {
            None => Err(ConnectorError::timeout(
                operation,
                timeout.unwrap_or_default(),
            )),
            Some(Err(panic)) => Err(ConnectorError::new(
                ErrorCode::ProviderError,
                format!(
                    "provider panicked during {operation}: {}",
                    panic_message(panic.as_ref())
                ),
            )),
            Some(Ok(Err(_))) if cancel.is_cancelled() => Err(ConnectorError::cancelled(operation)),
            Some(Ok(Err(err))) => Err(ConnectorError::from_provider(operation, err)),
            Some(Ok(Ok(value))) => Ok(value),
        }
    }
}

/// Run `fut`, giving up after `timeout` when one is set.
async fn within<F: Future>(timeout: Option<Duration>, fut: F) -> Option<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
