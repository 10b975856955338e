//! Command bridge between the station front end and the check-in client.
//!
//! The front end (today the CLI in `main.rs`, tomorrow a kiosk UI) never
//! touches the connection or the use cases directly.  It calls the commands
//! in this module, each of which reads or updates [`AppState`] and returns a
//! [`CommandResult`].
//!
//! ```text
//! front end                        ui_bridge                    application
//! ───────────────────────────────────────────────────────────────────────────
//! scan_payload(raw)        ──────> parse, fill form
//! toggle_connection()      ──────> validate host/port, set flag  (driver picks it up)
//! submit_visit()           ──────> build record, gate ─────────> SubmitVisitUseCase
//! get_status()             <────── StatusDto snapshot
//! ```
//!
//! # Operator messages
//!
//! Every command leaves a short Spanish status line in `AppState::message`
//! (the gate staff's language).  Failed commands also return the same text
//! as their `error`, so a front end can show either.
//!
//! # DTOs (Data Transfer Objects)
//!
//! `AppState` is made of async `Mutex`es and is not serializable.  The DTO
//! structs are plain snapshots that can cross an IPC boundary as JSON.
//!
//! # `CommandResult<T>`
//!
//! All commands return the same envelope:
//! ```json
//! { "success": true,  "data": {...}, "error": null  }
//! { "success": false, "data": null,  "error": "..."  }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use checkin_core::{
    parse_payload, reading_timestamp_now, ConfigError, ConnectionConfig, PayloadError,
    RecordBuilder, StudentRecord, VisitDetails,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::maintain_connection::{DriverContext, ReconcileOutcome};
use crate::application::submit_visit::SubmitVisitUseCase;
use crate::infrastructure::network::{ConnectionState, Connector, PersistentConnection};
use crate::infrastructure::storage::config::ClientSettings;

// ── Operator messages ─────────────────────────────────────────────────────────

pub const MSG_READY: &str = "Escanea QR o llena los datos manualmente";
pub const MSG_NO_QR: &str = "No se pudo leer un QR valido";
pub const MSG_MISSING_FIELDS: &str = "QR leido, pero no contiene los campos requeridos";
pub const MSG_SCAN_OK: &str = "Lectura exitosa";
pub const MSG_CLOSED: &str = "Conexion cerrada";
pub const MSG_ENTER_HOST: &str = "Ingresa la IP del servidor";
pub const MSG_INVALID_PORT: &str = "Puerto invalido";
pub const MSG_STAYING_CONNECTED: &str = "Conexion activa con reconexion automatica";
pub const MSG_CONNECT_FIRST: &str = "Primero conectate al servidor";
pub const MSG_INCOMPLETE: &str = "Completa documento, carné, nombres, apellidos y grado";
pub const MSG_SENT: &str = "Informacion enviada al servidor";
pub const MSG_CONNECTION_LOST: &str = "Conexion perdida, reconectando...";
pub const MSG_RETRYING: &str = "Reintentando conexion...";
pub const MSG_INVALID_SETTINGS: &str = "Configura IP/puerto validos para reconectar";

// ── Shared application state ──────────────────────────────────────────────────

/// Runtime state shared between the front end, the commands and the
/// reconnection driver.
pub struct AppState {
    /// Connection state as last observed by the driver or a submit.
    pub connection_status: Mutex<ConnectionState>,
    /// The operator's "stay connected" wish.  Read by every driver tick.
    pub stay_connected: AtomicBool,
    pub station: Mutex<StationSettingsDto>,
    /// The record being registered, as editable text.
    pub form: Mutex<StudentFormDto>,
    /// Last status line shown to the operator.
    pub message: Mutex<String>,
}

impl AppState {
    /// Creates a new `AppState` with default station settings.
    pub fn new() -> Arc<Self> {
        Self::from_settings(&ClientSettings::default())
    }

    /// Creates a new `AppState` seeded from the settings file.
    ///
    /// The stay-connected flag always starts clear; use
    /// [`toggle_connection`] to set it so host and port get validated.
    pub fn from_settings(settings: &ClientSettings) -> Arc<Self> {
        Arc::new(Self {
            connection_status: Mutex::new(ConnectionState::Disconnected),
            stay_connected: AtomicBool::new(false),
            station: Mutex::new(StationSettingsDto::from(settings)),
            form: Mutex::new(StudentFormDto::default()),
            message: Mutex::new(MSG_READY.to_string()),
        })
    }

    async fn set_message(&self, message: impl Into<String>) {
        *self.message.lock().await = message.into();
    }

    async fn set_status(&self, status: ConnectionState) {
        *self.connection_status.lock().await = status;
    }

    /// Records `message` for the operator and returns it as a failure.
    async fn fail<T: Serialize>(&self, message: &str) -> CommandResult<T> {
        self.set_message(message).await;
        CommandResult::err(message)
    }
}

#[async_trait]
impl DriverContext for AppState {
    fn stay_connected(&self) -> bool {
        self.stay_connected.load(Ordering::SeqCst)
    }

    async fn server_address(&self) -> (String, String) {
        let station = self.station.lock().await;
        (station.host.clone(), station.port.clone())
    }

    async fn apply_outcome(&self, outcome: &ReconcileOutcome) {
        let (status, message) = match outcome {
            ReconcileOutcome::Idle => (ConnectionState::Disconnected, None),
            ReconcileOutcome::InvalidSettings(_) => {
                (ConnectionState::Disconnected, Some(MSG_INVALID_SETTINGS.to_string()))
            }
            ReconcileOutcome::Connected(config) => {
                (ConnectionState::Connected, Some(format!("Conectado a {config}")))
            }
            ReconcileOutcome::RetryScheduled(_) => {
                (ConnectionState::Disconnected, Some(MSG_RETRYING.to_string()))
            }
            ReconcileOutcome::ConnectionLost => {
                (ConnectionState::Disconnected, Some(MSG_CONNECTION_LOST.to_string()))
            }
            ReconcileOutcome::StillConnected => (ConnectionState::Connected, None),
        };

        self.set_status(status).await;
        if let Some(message) = message {
            self.set_message(message).await;
        }
    }
}

// ── DTOs ──────────────────────────────────────────────────────────────────────

/// The student form as the operator sees it.
///
/// Filled by a successful scan and editable by hand.  Nothing here is
/// validated until [`submit_visit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFormDto {
    pub documento: String,
    pub carne: String,
    pub nombres: String,
    pub apellidos: String,
    pub grado: String,
    /// `yyyy-MM-dd HH:mm:ss`; stamped by the scan, replaced with now on
    /// submit if left blank.
    pub reading_time: String,
    pub observation: String,
}

impl StudentFormDto {
    fn to_builder(&self) -> RecordBuilder {
        StudentRecord::builder()
            .documento(self.documento.as_str())
            .carne(self.carne.as_str())
            .nombres(self.nombres.as_str())
            .apellidos(self.apellidos.as_str())
            .grado(self.grado.as_str())
    }

    fn fill_from(&mut self, record: &StudentRecord, reading_time: String) {
        self.documento = record.documento().to_string();
        self.carne = record.carne().to_string();
        self.nombres = record.nombres().to_string();
        self.apellidos = record.apellidos().to_string();
        self.grado = record.grado().to_string();
        self.reading_time = reading_time;
    }
}

/// Server address and visit metadata, as editable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationSettingsDto {
    pub host: String,
    /// Kept as typed; validated on each connect attempt.
    pub port: String,
    pub device: String,
    pub operator: String,
    pub punctuality_enabled: bool,
    /// `HH:MM`.
    pub expected_time: String,
}

impl From<&ClientSettings> for StationSettingsDto {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port.to_string(),
            device: settings.station.device.clone(),
            operator: settings.station.operator.clone(),
            punctuality_enabled: settings.station.punctuality_enabled,
            expected_time: settings.station.expected_entry_time.clone(),
        }
    }
}

/// Full status snapshot for the front end.
#[derive(Debug, Clone, Serialize)]
pub struct StatusDto {
    /// `"Disconnected"`, `"Connecting"` or `"Connected"`.
    pub connection_status: String,
    pub stay_connected: bool,
    /// `host:port` as typed.
    pub server_address: String,
    pub message: String,
    pub form: StudentFormDto,
    /// The form as a validated record, if it currently is one.
    pub current_record: Option<StudentRecord>,
}

/// Unified response wrapper for every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the current status snapshot.
pub async fn get_status(state: Arc<AppState>) -> CommandResult<StatusDto> {
    let status = *state.connection_status.lock().await;
    let server_address = {
        let station = state.station.lock().await;
        format!("{}:{}", station.host.trim(), station.port.trim())
    };
    let form = state.form.lock().await.clone();
    let message = state.message.lock().await.clone();

    CommandResult::ok(StatusDto {
        connection_status: format!("{status:?}"),
        stay_connected: state.stay_connected(),
        server_address,
        message,
        current_record: form.to_builder().build().ok(),
        form,
    })
}

pub async fn get_station_settings(state: Arc<AppState>) -> CommandResult<StationSettingsDto> {
    CommandResult::ok(state.station.lock().await.clone())
}

/// Replaces the station settings.
///
/// Host and port are not checked here; a bad address surfaces on the next
/// connect attempt.  A new address takes effect on the next reconnect.
pub async fn update_station_settings(
    state: Arc<AppState>,
    settings: StationSettingsDto,
) -> CommandResult<()> {
    *state.station.lock().await = settings;
    CommandResult::ok(())
}

/// Replaces the form with manually entered values.
pub async fn update_form(state: Arc<AppState>, form: StudentFormDto) -> CommandResult<()> {
    *state.form.lock().await = form;
    CommandResult::ok(())
}

/// Handles one scanner result.
///
/// On success the form is overwritten with the scanned record and the
/// reading time is stamped with the local clock.  The observation is kept.
pub async fn scan_payload(state: Arc<AppState>, raw: &str) -> CommandResult<StudentFormDto> {
    let record = match parse_payload(raw) {
        Ok(record) => record,
        Err(PayloadError::Blank) => return state.fail(MSG_NO_QR).await,
        Err(e) => {
            debug!("scan rejected: {e}");
            return state.fail(MSG_MISSING_FIELDS).await;
        }
    };

    let form = {
        let mut form = state.form.lock().await;
        form.fill_from(&record, reading_timestamp_now());
        form.clone()
    };
    state.set_message(MSG_SCAN_OK).await;
    CommandResult::ok(form)
}

/// Starts or stops staying connected.  Returns the new flag value.
///
/// Stopping closes the connection immediately.  Starting only validates the
/// address and sets the flag; the driver's next tick does the connecting.
pub async fn toggle_connection<C: Connector>(
    state: Arc<AppState>,
    connection: &PersistentConnection<C>,
) -> CommandResult<bool> {
    if state.stay_connected.swap(false, Ordering::SeqCst) {
        connection.close().await;
        state.set_status(ConnectionState::Disconnected).await;
        state.set_message(MSG_CLOSED).await;
        return CommandResult::ok(false);
    }

    let (host, port) = state.server_address().await;
    match ConnectionConfig::parse(&host, &port) {
        Ok(_) => {}
        Err(ConfigError::BlankHost) => return state.fail(MSG_ENTER_HOST).await,
        Err(ConfigError::InvalidPort(_)) => return state.fail(MSG_INVALID_PORT).await,
    }

    state.stay_connected.store(true, Ordering::SeqCst);
    state.set_message(MSG_STAYING_CONNECTED).await;
    CommandResult::ok(true)
}

/// Validates the form and sends it.  Returns the wire line on success.
///
/// Refused unless the operator is staying connected and the connection is
/// up.  A blank reading time is replaced with now and written back to the
/// form.  Device, operator and observation go out exactly as typed.
pub async fn submit_visit<C: Connector>(
    state: Arc<AppState>,
    use_case: &SubmitVisitUseCase<C>,
) -> CommandResult<String> {
    let connected = *state.connection_status.lock().await == ConnectionState::Connected;
    if !state.stay_connected() || !connected {
        return state.fail(MSG_CONNECT_FIRST).await;
    }

    let prepared = {
        let mut form = state.form.lock().await;
        form.to_builder().build().map(|record| {
            if form.reading_time.trim().is_empty() {
                form.reading_time = reading_timestamp_now();
            }
            (record, form.reading_time.trim().to_string(), form.observation.clone())
        })
    };
    let (record, reading_time, observation) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            debug!("submit rejected: {e}");
            return state.fail(MSG_INCOMPLETE).await;
        }
    };

    let details = {
        let station = state.station.lock().await;
        VisitDetails {
            reading_time,
            device: station.device.clone(),
            operator: station.operator.clone(),
            punctuality_enabled: station.punctuality_enabled,
            expected_time: station.expected_time.clone(),
            observation,
        }
    };

    match use_case.submit(&record, &details).await {
        Ok(line) => {
            state.set_message(MSG_SENT).await;
            CommandResult::ok(line)
        }
        Err(e) => {
            warn!("check-in not delivered: {e}");
            state.set_status(ConnectionState::Disconnected).await;
            state.fail(MSG_CONNECTION_LOST).await
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::application::maintain_connection::ConnectionDriver;
    use crate::infrastructure::network::{mock::MockConnector, DEFAULT_CONNECT_TIMEOUT};

    const SCAN: &str = "documento:1020;carne:C-7;nombres:Ana;apellidos:Ruiz;grado:5to";

    struct Harness {
        state: Arc<AppState>,
        mock: MockConnector,
        connection: Arc<PersistentConnection<MockConnector>>,
        driver: ConnectionDriver<MockConnector>,
        submit: SubmitVisitUseCase<MockConnector>,
    }

    fn harness() -> Harness {
        let state = AppState::new();
        let mock = MockConnector::new();
        let connection = Arc::new(PersistentConnection::new(
            mock.clone(),
            DEFAULT_CONNECT_TIMEOUT,
        ));
        let context: Arc<dyn DriverContext> = state.clone();
        Harness {
            driver: ConnectionDriver::new(
                Arc::clone(&connection),
                context,
                Duration::from_millis(10),
            ),
            submit: SubmitVisitUseCase::new(Arc::clone(&connection)),
            state,
            mock,
            connection,
        }
    }

    /// Sets the flag and lets the driver connect.
    async fn go_online(h: &Harness) {
        assert!(toggle_connection(Arc::clone(&h.state), &h.connection).await.success);
        h.driver.reconcile_once().await;
    }

    async fn message(state: &AppState) -> String {
        state.message.lock().await.clone()
    }

    // ── Status ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_status_initially_disconnected_with_default_address() {
        // Arrange
        let state = AppState::new();

        // Act
        let result = get_status(state).await;

        // Assert
        assert!(result.success);
        let dto = result.data.unwrap();
        assert_eq!(dto.connection_status, "Disconnected");
        assert_eq!(dto.server_address, "192.168.1.10:5050");
        assert!(!dto.stay_connected);
        assert!(dto.current_record.is_none());
        assert_eq!(dto.message, MSG_READY);
    }

    #[tokio::test]
    async fn test_status_dto_serializes_record_fields() {
        let state = AppState::new();
        scan_payload(Arc::clone(&state), SCAN).await;

        let dto = get_status(state).await.data.unwrap();
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["current_record"]["carne"], "C-7");
        assert_eq!(json["message"], MSG_SCAN_OK);
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_scan_fills_form_and_stamps_reading_time() {
        // Arrange
        let state = AppState::new();
        state.form.lock().await.observation = "con acudiente".to_string();

        // Act
        let result = scan_payload(Arc::clone(&state), SCAN).await;

        // Assert
        assert!(result.success);
        let form = result.data.unwrap();
        assert_eq!(form.documento, "1020");
        assert_eq!(form.grado, "5to");
        assert_eq!(form.reading_time.len(), "2024-03-01 06:59:00".len());
        assert_eq!(form.observation, "con acudiente");
        assert_eq!(message(&state).await, MSG_SCAN_OK);
    }

    #[tokio::test]
    async fn test_blank_scan_reports_unreadable_qr() {
        let state = AppState::new();

        let result = scan_payload(Arc::clone(&state), "   ").await;

        assert!(!result.success);
        assert_eq!(result.error.unwrap(), MSG_NO_QR);
        assert_eq!(message(&state).await, MSG_NO_QR);
    }

    #[tokio::test]
    async fn test_incomplete_scan_keeps_previous_form() {
        // Arrange
        let state = AppState::new();
        scan_payload(Arc::clone(&state), SCAN).await;

        // Act
        let result =
            scan_payload(Arc::clone(&state), "documento:999;nombres:Luis;grado:6to").await;

        // Assert
        assert_eq!(result.error.unwrap(), MSG_MISSING_FIELDS);
        assert_eq!(state.form.lock().await.documento, "1020");
    }

    // ── Connection toggle ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_toggle_rejects_blank_host_and_bad_port() {
        let h = harness();

        h.state.station.lock().await.host = "  ".to_string();
        let blank = toggle_connection(Arc::clone(&h.state), &h.connection).await;
        assert_eq!(blank.error.unwrap(), MSG_ENTER_HOST);

        {
            let mut station = h.state.station.lock().await;
            station.host = "10.0.0.5".to_string();
            station.port = "70000".to_string();
        }
        let bad_port = toggle_connection(Arc::clone(&h.state), &h.connection).await;
        assert_eq!(bad_port.error.unwrap(), MSG_INVALID_PORT);

        assert!(!h.state.stay_connected());
    }

    #[tokio::test]
    async fn test_toggle_on_then_driver_connects() {
        // Arrange
        let h = harness();

        // Act
        let result = toggle_connection(Arc::clone(&h.state), &h.connection).await;
        assert_eq!(message(&h.state).await, MSG_STAYING_CONNECTED);
        h.driver.reconcile_once().await;

        // Assert
        assert_eq!(result.data, Some(true));
        assert_eq!(*h.state.connection_status.lock().await, ConnectionState::Connected);
        assert_eq!(message(&h.state).await, "Conectado a 192.168.1.10:5050");
    }

    #[tokio::test]
    async fn test_toggle_off_closes_connection() {
        let h = harness();
        go_online(&h).await;

        let result = toggle_connection(Arc::clone(&h.state), &h.connection).await;

        assert_eq!(result.data, Some(false));
        assert!(!h.connection.is_active().await);
        assert_eq!(*h.state.connection_status.lock().await, ConnectionState::Disconnected);
        assert_eq!(message(&h.state).await, MSG_CLOSED);
    }

    #[tokio::test]
    async fn test_driver_messages_for_retry_and_loss() {
        let h = harness();
        h.mock.set_refuse_connections(true);
        toggle_connection(Arc::clone(&h.state), &h.connection).await;

        h.driver.reconcile_once().await;
        assert_eq!(message(&h.state).await, MSG_RETRYING);

        h.mock.set_refuse_connections(false);
        h.driver.reconcile_once().await;
        h.mock.drop_peer();
        h.driver.reconcile_once().await;
        assert_eq!(message(&h.state).await, MSG_CONNECTION_LOST);
        assert_eq!(*h.state.connection_status.lock().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_driver_reports_invalid_settings_edited_after_toggle() {
        let h = harness();
        toggle_connection(Arc::clone(&h.state), &h.connection).await;
        h.state.station.lock().await.port = "abc".to_string();

        h.driver.reconcile_once().await;

        assert_eq!(message(&h.state).await, MSG_INVALID_SETTINGS);
        assert_eq!(h.mock.connect_attempts(), 0);
    }

    // ── Submitting ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_submit_while_offline_is_refused() {
        let h = harness();
        scan_payload(Arc::clone(&h.state), SCAN).await;

        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        assert_eq!(result.error.unwrap(), MSG_CONNECT_FIRST);
        assert!(h.mock.sent_lines().is_empty());
    }

    #[tokio::test]
    async fn test_submit_incomplete_form_is_refused() {
        let h = harness();
        go_online(&h).await;
        update_form(
            Arc::clone(&h.state),
            StudentFormDto {
                documento: "1020".to_string(),
                nombres: "Ana".to_string(),
                ..StudentFormDto::default()
            },
        )
        .await;

        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        assert_eq!(result.error.unwrap(), MSG_INCOMPLETE);
        assert!(h.mock.sent_lines().is_empty());
    }

    #[tokio::test]
    async fn test_submit_sends_form_with_station_metadata() {
        // Arrange
        let h = harness();
        go_online(&h).await;
        {
            let mut station = h.state.station.lock().await;
            station.device = " Porteria 1 ".to_string();
            station.operator = "Prof. Díaz".to_string();
        }
        update_form(
            Arc::clone(&h.state),
            StudentFormDto {
                documento: "1020".to_string(),
                carne: "C-7".to_string(),
                nombres: "Ana".to_string(),
                apellidos: "Ruiz".to_string(),
                grado: "5to".to_string(),
                reading_time: "2024-03-01 07:01:00".to_string(),
                observation: "sin uniforme".to_string(),
            },
        )
        .await;

        // Act
        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        // Assert
        assert!(result.success, "{:?}", result.error);
        assert_eq!(message(&h.state).await, MSG_SENT);
        let sent = h.mock.sent_lines();
        assert_eq!(sent.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
        assert_eq!(value["dispositivo"], " Porteria 1 ");
        assert_eq!(value["docente_funcionario"], "Prof. Díaz");
        assert_eq!(value["estado_ingreso"], "Tarde");
        assert_eq!(value["observacion"], "sin uniforme");
    }

    #[tokio::test]
    async fn test_submit_sends_free_text_exactly_as_typed() {
        // Arrange
        let h = harness();
        go_online(&h).await;
        scan_payload(Arc::clone(&h.state), SCAN).await;
        {
            let mut station = h.state.station.lock().await;
            station.device = "Porteria 1\t".to_string();
            station.operator = "  Prof. Díaz".to_string();
            station.expected_time = " 07:00 ".to_string();
        }
        h.state.form.lock().await.observation = "  llegó con acudiente\n".to_string();

        // Act
        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        // Assert
        let value: serde_json::Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(value["dispositivo"], "Porteria 1\t");
        assert_eq!(value["docente_funcionario"], "  Prof. Díaz");
        assert_eq!(value["observacion"], "  llegó con acudiente\n");
        assert_ne!(value["estado_ingreso"], "Hora esperada invalida");
    }

    #[tokio::test]
    async fn test_submit_fills_blank_reading_time() {
        let h = harness();
        go_online(&h).await;
        scan_payload(Arc::clone(&h.state), SCAN).await;
        h.state.form.lock().await.reading_time = "  ".to_string();

        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        assert!(result.success);
        let stored = h.state.form.lock().await.reading_time.clone();
        assert!(!stored.trim().is_empty());
        let value: serde_json::Value = serde_json::from_str(&result.data.unwrap()).unwrap();
        assert_eq!(value["fecha_hora_lectura"], stored.as_str());
    }

    #[tokio::test]
    async fn test_submit_failure_drops_connected_flag() {
        // Arrange
        let h = harness();
        go_online(&h).await;
        scan_payload(Arc::clone(&h.state), SCAN).await;
        h.mock.set_fail_writes(true);

        // Act
        let result = submit_visit(Arc::clone(&h.state), &h.submit).await;

        // Assert
        assert_eq!(result.error.unwrap(), MSG_CONNECTION_LOST);
        assert_eq!(*h.state.connection_status.lock().await, ConnectionState::Disconnected);
        assert!(h.state.stay_connected());

        // The next tick reconnects and a retry goes through.
        h.mock.set_fail_writes(false);
        h.driver.reconcile_once().await;
        assert!(submit_visit(Arc::clone(&h.state), &h.submit).await.success);
        assert_eq!(h.mock.sent_lines().len(), 1);
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_station_settings_applies_new_values() {
        let state = AppState::new();
        let mut settings = get_station_settings(Arc::clone(&state)).await.data.unwrap();
        settings.host = "10.1.1.20".to_string();
        settings.punctuality_enabled = false;

        assert!(update_station_settings(Arc::clone(&state), settings).await.success);

        let stored = get_station_settings(state).await.data.unwrap();
        assert_eq!(stored.host, "10.1.1.20");
        assert!(!stored.punctuality_enabled);
    }

    #[test]
    fn test_command_result_ok_sets_success_true() {
        let r: CommandResult<u32> = CommandResult::ok(99);
        assert!(r.success);
        assert_eq!(r.data, Some(99));
        assert!(r.error.is_none());
    }

    #[test]
    fn test_command_result_err_sets_success_false() {
        let r: CommandResult<u32> = CommandResult::err("oops");
        assert!(!r.success);
        assert!(r.data.is_none());
        assert_eq!(r.error.unwrap(), "oops");
    }
}
