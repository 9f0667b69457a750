#![allow(clippy::unwrap_used, clippy::expect_used)]
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    switchboard_common::{
        DataType, Endpoint, EndpointType, Message, MessageContent, MessageContentType,
    },
    switchboard_connector::{
        BatchSender, ChannelProvider, Connector, ConnectorConfig, ConnectorError, ConnectorRegistry,
        ConnectorState, ErrorCode, HealthProbe, Inbound, MessageSource, MessageStatus,
        ProviderHealth, SendResult, StatusQuery, StatusUpdate,
    },
    switchboard_schema::{
        AuthenticationType, Capabilities, ChannelParameter, ChannelSchema, ConnectionSettings,
        EndpointRule,
    },
    tokio_util::sync::CancellationToken,
};

// ── Mock provider ───────────────────────────────────────────────────────────

#[derive(Default)]
struct Calls {
    initialize: AtomicUsize,
    send: AtomicUsize,
    batch: AtomicUsize,
    disconnect: AtomicUsize,
    status: AtomicUsize,
    receive: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl Calls {
    fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mode {
    Ok,
    Hang,
    Panic,
    Fail,
}

struct MockProvider {
    calls: Arc<Calls>,
    init: Mode,
    send: Mode,
    init_delay: Duration,
    fail_ids: Vec<String>,
    native_batch: bool,
    adapters: bool,
}

impl MockProvider {
    fn new(calls: &Arc<Calls>) -> Self {
        Self {
            calls: Arc::clone(calls),
            init: Mode::Ok,
            send: Mode::Ok,
            init_delay: Duration::ZERO,
            fail_ids: Vec::new(),
            native_batch: true,
            adapters: true,
        }
    }

    fn failing(mut self, ids: &[&str]) -> Self {
        self.fail_ids = ids.iter().map(|id| (*id).to_string()).collect();
        self
    }

    fn shared(self) -> Arc<dyn ChannelProvider> {
        Arc::new(self)
    }
}

async fn act(mode: Mode) -> anyhow::Result<()> {
    match mode {
        Mode::Ok => Ok(()),
        Mode::Hang => std::future::pending().await,
        Mode::Panic => panic!("provider bug"),
        Mode::Fail => anyhow::bail!("upstream refused the request"),
    }
}

#[async_trait]
impl ChannelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(
        &self,
        settings: &ConnectionSettings,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        self.calls.initialize.fetch_add(1, Ordering::SeqCst);
        assert!(settings.get_or_default("Timeout").is_some());
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        act(self.init).await
    }

    async fn test_connection(&self, _cancel: &CancellationToken) -> anyhow::Result<()> {
        Ok(())
    }

    async fn send(
        &self,
        message: &Message,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<SendResult> {
        self.calls.send.fetch_add(1, Ordering::SeqCst);
        act(self.send).await?;
        if self.fail_ids.contains(&message.id) {
            anyhow::bail!("rejected by upstream: {}", message.id);
        }
        Ok(SendResult::new(&message.id, MessageStatus::Sent)
            .with_remote_id(format!("SM-{}", message.id)))
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn batch(&self) -> Option<&dyn BatchSender> {
        if self.native_batch { Some(self) } else { None }
    }

    fn status_query(&self) -> Option<&dyn StatusQuery> {
        if self.adapters { Some(self) } else { None }
    }

    fn inbound(&self) -> Option<&dyn Inbound> {
        if self.adapters { Some(self) } else { None }
    }

    fn health(&self) -> Option<&dyn HealthProbe> {
        if self.adapters { Some(self) } else { None }
    }
}

#[async_trait]
impl BatchSender for MockProvider {
    async fn send_batch(
        &self,
        messages: &[&Message],
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<anyhow::Result<SendResult>>> {
        self.calls.batch.fetch_add(1, Ordering::SeqCst);
        self.calls.batch_sizes.lock().unwrap().push(messages.len());
        Ok(messages
            .iter()
            .map(|message| {
                if self.fail_ids.contains(&message.id) {
                    Err(anyhow::anyhow!("rejected by upstream: {}", message.id))
                } else {
                    Ok(SendResult::new(&message.id, MessageStatus::Queued))
                }
            })
            .collect())
    }
}

#[async_trait]
impl StatusQuery for MockProvider {
    async fn query_status(
        &self,
        message_id: &str,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<StatusUpdate> {
        self.calls.status.fetch_add(1, Ordering::SeqCst);
        Ok(StatusUpdate::new(message_id, MessageStatus::Delivered))
    }
}

#[async_trait]
impl Inbound for MockProvider {
    async fn receive(
        &self,
        source: &MessageSource,
        _cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<Message>> {
        self.calls.receive.fetch_add(1, Ordering::SeqCst);
        let body = source.as_json()?;
        let text = body["Body"].as_str().unwrap_or_default();
        let message = Message::new(MessageContent::text(text))
            .with_sender(Endpoint::phone(body["From"].as_str().unwrap_or_default()))
            .with_receiver(Endpoint::phone(body["To"].as_str().unwrap_or_default()));
        Ok(vec![message])
    }
}

#[async_trait]
impl HealthProbe for MockProvider {
    async fn probe(&self, _cancel: &CancellationToken) -> anyhow::Result<ProviderHealth> {
        Ok(ProviderHealth::healthy())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

fn sms_schema() -> ChannelSchema {
    ChannelSchema::new("Twilio", "SMS", "1.0.0")
        .unwrap()
        .with_display_name("Twilio SMS")
        .with_capabilities(
            Capabilities::SEND_MESSAGES
                | Capabilities::RECEIVE_MESSAGES
                | Capabilities::MESSAGE_STATUS_QUERY
                | Capabilities::BULK_MESSAGING
                | Capabilities::HEALTH_CHECK
                | Capabilities::HANDLE_MESSAGE_STATE,
        )
        .add_parameter(ChannelParameter::new("AccountSid", DataType::String).required())
        .unwrap()
        .add_parameter(
            ChannelParameter::new("AuthToken", DataType::String)
                .required()
                .sensitive(),
        )
        .unwrap()
        .add_parameter(ChannelParameter::new("Timeout", DataType::Integer).with_default(30))
        .unwrap()
        .add_endpoint(EndpointRule::new(EndpointType::PhoneNumber))
        .unwrap()
        .add_content_types([MessageContentType::PlainText, MessageContentType::Media])
        .add_authentication_type(AuthenticationType::Basic)
}

fn settings() -> ConnectionSettings {
    ConnectionSettings::new()
        .with("AccountSid", "AC123")
        .with("AuthToken", "secret")
}

fn sms(id: &str) -> Message {
    Message::new(MessageContent::text("hello"))
        .with_id(id)
        .with_sender(Endpoint::phone("+15550100"))
        .with_receiver(Endpoint::phone("+15550199"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn connector(provider: MockProvider) -> Connector {
    init_tracing();
    Connector::new(sms_schema().into_shared(), provider.shared())
}

async fn connected(provider: MockProvider) -> Connector {
    let connector = connector(provider);
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();
    connector
}

fn code<T: std::fmt::Debug>(result: Result<T, ConnectorError>) -> ErrorCode {
    result.unwrap_err().code()
}

// ── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn operations_before_initialize_never_reach_the_provider() {
    let calls = Arc::new(Calls::default());
    let connector = connector(MockProvider::new(&calls));
    let cancel = CancellationToken::new();

    assert_eq!(connector.state(), ConnectorState::Uninitialized);
    assert_eq!(code(connector.send_message(&sms("m1"), &cancel).await), ErrorCode::NotInitialized);
    assert_eq!(
        code(connector.send_messages(&[sms("m1")], &cancel).await),
        ErrorCode::NotInitialized
    );
    assert_eq!(
        code(connector.get_message_status("m1", &cancel).await),
        ErrorCode::NotInitialized
    );
    assert_eq!(code(connector.get_health(&cancel).await), ErrorCode::NotInitialized);
    assert_eq!(code(connector.test_connection(&cancel).await), ErrorCode::NotInitialized);
    assert_eq!(code(connector.disconnect(&cancel).await), ErrorCode::NotInitialized);

    assert_eq!(Calls::count(&calls.send), 0);
    assert_eq!(Calls::count(&calls.batch), 0);
    assert_eq!(Calls::count(&calls.status), 0);
}

#[tokio::test]
async fn initialize_connects_and_disconnect_allows_reinitialize() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let cancel = CancellationToken::new();
    assert_eq!(connector.state(), ConnectorState::Connected);

    connector.disconnect(&cancel).await.unwrap();
    assert_eq!(connector.state(), ConnectorState::Disconnected);
    assert_eq!(Calls::count(&calls.disconnect), 1);
    assert_eq!(code(connector.send_message(&sms("m1"), &cancel).await), ErrorCode::NotInitialized);

    connector.initialize(&settings(), &cancel).await.unwrap();
    assert!(connector.is_connected());
    assert_eq!(Calls::count(&calls.initialize), 2);
}

#[tokio::test]
async fn initialize_twice_is_invalid_state() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let err = connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert_eq!(Calls::count(&calls.initialize), 1);
}

#[tokio::test]
async fn invalid_settings_fail_without_calling_the_provider() {
    let calls = Arc::new(Calls::default());
    let connector = connector(MockProvider::new(&calls));
    let settings = ConnectionSettings::new()
        .with("AccountSid", "AC123")
        .with("Region", "us1");

    let err = connector
        .initialize(&settings, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    let messages: Vec<&str> = err
        .validation_failures
        .iter()
        .map(|f| f.message.as_str())
        .collect();
    assert!(messages[0].contains("AuthToken"));
    assert!(messages.last().unwrap().starts_with("Unknown parameter 'Region'"));
    assert_eq!(connector.state(), ConnectorState::Error);
    assert_eq!(Calls::count(&calls.initialize), 0);

    connector
        .initialize(&self::settings(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(connector.is_connected());
}

#[tokio::test]
async fn provider_failure_during_initialize_moves_to_error() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.init = Mode::Fail;
    let connector = connector(provider);

    let err = connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert!(err.message.contains("upstream refused"));
    assert_eq!(connector.state(), ConnectorState::Error);
}

#[tokio::test]
async fn concurrent_initialize_has_one_winner() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.init_delay = Duration::from_millis(30);
    let connector = connector(provider);
    let cancel = CancellationToken::new();
    let settings = settings();

    let (first, second) = tokio::join!(
        connector.initialize(&settings, &cancel),
        connector.initialize(&settings, &cancel)
    );
    let codes: Vec<Option<ErrorCode>> = [first, second]
        .into_iter()
        .map(|r| r.err().map(|e| e.code()))
        .collect();
    assert!(codes.contains(&None));
    assert!(codes.contains(&Some(ErrorCode::InvalidState)));
    assert_eq!(Calls::count(&calls.initialize), 1);
    assert!(connector.is_connected());
}

// ── Dispatch guard ──────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_token_short_circuits() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert_eq!(code(connector.send_message(&sms("m1"), &cancel).await), ErrorCode::Cancelled);
    assert_eq!(Calls::count(&calls.send), 0);
}

#[tokio::test]
async fn cancellation_interrupts_a_hanging_provider() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.send = Mode::Hang;
    let connector = connector(provider).with_config(ConnectorConfig::default().without_timeout());
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    assert_eq!(code(connector.send_message(&sms("m1"), &cancel).await), ErrorCode::Cancelled);
    assert_eq!(Calls::count(&calls.send), 1);
    assert!(connector.is_connected());
}

#[tokio::test]
async fn slow_provider_times_out() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.send = Mode::Hang;
    let connector = connector(provider)
        .with_config(ConnectorConfig::default().with_operation_timeout(Duration::from_millis(25)));
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();

    let err = connector
        .send_message(&sms("m1"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Timeout);
    assert!(err.message.contains("25ms"));
}

#[tokio::test]
async fn provider_panic_becomes_provider_error() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.send = Mode::Panic;
    let connector = connected(provider).await;

    let err = connector
        .send_message(&sms("m1"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ProviderError);
    assert!(err.message.contains("provider bug"));
    assert!(connector.is_connected());
}

// ── Gating ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_message_is_rejected_before_dispatch() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let message = Message::new(MessageContent::html("<b>hi</b>"))
        .with_id("")
        .with_receiver(Endpoint::email("ops@example.com"));

    let err = connector
        .send_message(&message, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationFailed);
    let members: Vec<&str> = err
        .validation_failures
        .iter()
        .flat_map(|f| f.members.iter().map(String::as_str))
        .collect();
    assert_eq!(members, vec!["Id", "Receiver", "Content"]);
    assert_eq!(Calls::count(&calls.send), 0);
}

#[tokio::test]
async fn undeclared_capability_is_not_supported() {
    let calls = Arc::new(Calls::default());
    let schema = sms_schema()
        .derive_named("Send only")
        .restrict_capabilities(Capabilities::SEND_MESSAGES)
        .into_shared();
    let connector = Connector::new(schema, MockProvider::new(&calls).shared());
    let cancel = CancellationToken::new();
    connector.initialize(&settings(), &cancel).await.unwrap();

    assert_eq!(
        code(connector.get_message_status("m1", &cancel).await),
        ErrorCode::NotSupported
    );
    assert_eq!(
        code(connector.receive_messages(&MessageSource::text("{}"), &cancel).await),
        ErrorCode::NotSupported
    );
    assert_eq!(code(connector.get_health(&cancel).await), ErrorCode::NotSupported);
    assert_eq!(Calls::count(&calls.status), 0);
    assert_eq!(Calls::count(&calls.receive), 0);
}

#[tokio::test]
async fn missing_adapter_is_not_supported() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.adapters = false;
    let connector = connected(provider).await;
    let cancel = CancellationToken::new();

    let err = connector.get_message_status("m1", &cancel).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotSupported);
    assert!(err.message.contains("not implemented by the provider"));

    let health = connector.get_health(&cancel).await.unwrap();
    assert!(health.is_healthy);
}

#[tokio::test]
async fn status_query_and_inbound() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let cancel = CancellationToken::new();

    let status = connector.get_message_status("SM-1", &cancel).await.unwrap();
    assert_eq!(status.status, MessageStatus::Delivered);
    assert_eq!(
        code(connector.get_message_status("  ", &cancel).await),
        ErrorCode::ValidationFailed
    );

    let source = MessageSource::json(&serde_json::json!({
        "From": "+15550123",
        "To": "+15550100",
        "Body": "STOP",
    }));
    let received = connector.receive_messages(&source, &cancel).await.unwrap();
    assert_eq!(received.messages.len(), 1);
    assert_eq!(received.messages[0].sender, Some(Endpoint::phone("+15550123")));

    // The mock does not parse status callbacks; the default adapter method
    // reports NOT_SUPPORTED through the provider error path.
    assert_eq!(
        code(connector.receive_message_status(&source, &cancel).await),
        ErrorCode::NotSupported
    );
}

#[tokio::test]
async fn health_reports_uptime() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let health = connector.get_health(&CancellationToken::new()).await.unwrap();
    assert!(health.is_healthy);
    assert_eq!(health.state, ConnectorState::Connected);
    assert!(health.uptime.is_some());
    assert!(health.issues.is_empty());
}

// ── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn native_batch_reports_partial_failure_in_order() {
    let calls = Arc::new(Calls::default());
    let connector = Connector::new(
        sms_schema().into_shared(),
        MockProvider::new(&calls).failing(&["m2"]).shared(),
    )
    .with_config(ConnectorConfig::default().with_max_batch_size(2));
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();

    let invalid = Message::new(MessageContent::html("<p>x</p>")).with_id("m3");
    let messages = vec![sms("m1"), sms("m2"), invalid, sms("m4"), sms("m5")];
    let batch = connector
        .send_messages(&messages, &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<&str> = batch.items.iter().map(|i| i.message_id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);
    let codes: Vec<Option<ErrorCode>> = batch
        .items
        .iter()
        .map(|i| i.outcome.as_ref().err().map(ConnectorError::code))
        .collect();
    assert_eq!(codes, vec![
        None,
        Some(ErrorCode::ProviderError),
        Some(ErrorCode::ValidationFailed),
        None,
        None,
    ]);
    assert_eq!(batch.successes().count(), 3);
    assert_eq!(Calls::count(&calls.send), 0);
    assert_eq!(*calls.batch_sizes.lock().unwrap(), vec![2, 2]);
}

#[tokio::test]
async fn without_bulk_capability_batches_go_one_by_one() {
    let calls = Arc::new(Calls::default());
    let schema = sms_schema()
        .derive()
        .remove_capability(Capabilities::BULK_MESSAGING)
        .into_shared();
    let connector = Connector::new(schema, MockProvider::new(&calls).failing(&["b"]).shared());
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();

    let batch = connector
        .send_messages(&[sms("a"), sms("b"), sms("c")], &CancellationToken::new())
        .await
        .unwrap();
    assert!(!batch.all_succeeded());
    let failed: Vec<&str> = batch.failures().map(|(id, _)| id).collect();
    assert_eq!(failed, vec!["b"]);
    assert_eq!(Calls::count(&calls.send), 3);
    assert_eq!(Calls::count(&calls.batch), 0);
}

#[tokio::test]
async fn empty_batch_is_ok() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let batch = connector
        .send_messages(&[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(batch.is_empty());
    assert_eq!(Calls::count(&calls.batch), 0);
}

// ── Dispose ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dispose_is_terminal_and_idempotent() {
    let calls = Arc::new(Calls::default());
    let connector = connected(MockProvider::new(&calls)).await;
    let cancel = CancellationToken::new();

    connector.dispose().await;
    connector.dispose().await;
    assert_eq!(connector.state(), ConnectorState::Disposed);
    assert_eq!(Calls::count(&calls.disconnect), 1);

    assert_eq!(code(connector.send_message(&sms("m1"), &cancel).await), ErrorCode::Disposed);
    assert_eq!(code(connector.initialize(&settings(), &cancel).await), ErrorCode::Disposed);
    assert_eq!(code(connector.disconnect(&cancel).await), ErrorCode::Disposed);
    assert_eq!(Calls::count(&calls.send), 0);
}

#[tokio::test]
async fn dispose_aborts_in_flight_calls() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.send = Mode::Hang;
    let connector = Arc::new(
        connector(provider).with_config(ConnectorConfig::default().without_timeout()),
    );
    connector
        .initialize(&settings(), &CancellationToken::new())
        .await
        .unwrap();

    let sender = Arc::clone(&connector);
    let in_flight = tokio::spawn(async move {
        sender
            .send_message(&sms("m1"), &CancellationToken::new())
            .await
            .map(|_| ())
            .map_err(|e| e.code())
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    connector.dispose().await;

    assert_eq!(in_flight.await.unwrap(), Err(ErrorCode::Disposed));
}

#[tokio::test]
async fn dispose_during_initialize_wins() {
    let calls = Arc::new(Calls::default());
    let mut provider = MockProvider::new(&calls);
    provider.init_delay = Duration::from_millis(100);
    let connector = Arc::new(
        connector(provider).with_config(ConnectorConfig::default().without_timeout()),
    );

    let initializer = Arc::clone(&connector);
    let pending = tokio::spawn(async move {
        initializer
            .initialize(&settings(), &CancellationToken::new())
            .await
            .map_err(|e| e.code())
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connector.state(), ConnectorState::Initializing);
    connector.dispose().await;

    assert_eq!(pending.await.unwrap(), Err(ErrorCode::Disposed));
    assert_eq!(connector.state(), ConnectorState::Disposed);
    assert_eq!(Calls::count(&calls.initialize), 1);
    assert_eq!(Calls::count(&calls.disconnect), 1);

    // Nothing left running can bring the connector back.
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(connector.state(), ConnectorState::Disposed);
    assert_eq!(Calls::count(&calls.disconnect), 1);
}

// ── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_resolves_derived_schemas() {
    let calls = Arc::new(Calls::default());
    let mut registry = ConnectorRegistry::new();
    let factory_calls = Arc::clone(&calls);
    registry
        .register(sms_schema().into_shared(), move || {
            MockProvider::new(&factory_calls).shared()
        })
        .unwrap();
    assert_eq!(registry.list(), vec!["Twilio/SMS/1.0.0"]);

    let customer = sms_schema()
        .derive_named("Customer SMS")
        .restrict_capabilities(Capabilities::SEND_MESSAGES)
        .into_shared();
    let connector = registry
        .connect(customer, &settings(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(connector.schema().display_name(), "Customer SMS");
    connector
        .send_message(&sms("m1"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(Calls::count(&calls.send), 1);

    let widened = sms_schema()
        .derive()
        .add_endpoint(EndpointRule::new(EndpointType::EmailAddress))
        .unwrap()
        .into_shared();
    assert_eq!(code(registry.create(widened)), ErrorCode::ValidationFailed);

    let unknown = ChannelSchema::new("Twilio", "SMS", "2.0.0").unwrap().into_shared();
    assert_eq!(code(registry.create(unknown)), ErrorCode::NotSupported);
}
