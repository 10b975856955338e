//! SubmitVisitUseCase: turns a validated record into one wire line and
//! sends it.
//!
//! The punctuality verdict is computed here, at send time, so changing the
//! expected entry time between scan and submit affects the verdict.

use std::sync::Arc;

use checkin_core::{serialize_visit, OutboundError, StudentRecord, VisitDetails};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::network::{ConnectionError, Connector, PersistentConnection};

/// Why a submission did not reach the server.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Encode(#[from] OutboundError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

pub struct SubmitVisitUseCase<C: Connector> {
    connection: Arc<PersistentConnection<C>>,
}

impl<C: Connector> SubmitVisitUseCase<C> {
    pub fn new(connection: Arc<PersistentConnection<C>>) -> Self {
        Self { connection }
    }

    /// Serializes and sends one check-in, returning the line that was sent.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Connection`] when there is no connection or the write
    /// fails (the connection is closed in that case).
    pub async fn submit(
        &self,
        record: &StudentRecord,
        details: &VisitDetails,
    ) -> Result<String, SubmitError> {
        let line = serialize_visit(record, details)?;
        self.connection.send(&line).await?;
        info!(documento = record.documento(), "check-in sent");
        Ok(line)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use checkin_core::ConnectionConfig;

    use super::*;
    use crate::infrastructure::network::{mock::MockConnector, DEFAULT_CONNECT_TIMEOUT};

    fn record() -> StudentRecord {
        StudentRecord::builder()
            .documento("1020")
            .carne("C-7")
            .nombres("Ana")
            .apellidos("Ruiz")
            .grado("5to")
            .build()
            .unwrap()
    }

    fn details() -> VisitDetails {
        VisitDetails {
            reading_time: "2024-03-01 06:59:00".to_string(),
            device: "Porteria 1".to_string(),
            ..VisitDetails::default()
        }
    }

    async fn connected(mock: &MockConnector) -> Arc<PersistentConnection<MockConnector>> {
        let connection = Arc::new(PersistentConnection::new(
            mock.clone(),
            DEFAULT_CONNECT_TIMEOUT,
        ));
        connection
            .connect(&ConnectionConfig::new("10.0.0.5", 5050).unwrap())
            .await
            .unwrap();
        connection
    }

    #[tokio::test]
    async fn test_submit_sends_the_serialized_line() {
        // Arrange
        let mock = MockConnector::new();
        let use_case = SubmitVisitUseCase::new(connected(&mock).await);

        // Act
        let line = use_case.submit(&record(), &details()).await.unwrap();

        // Assert
        assert_eq!(mock.sent_lines(), vec![line.clone()]);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["estado_ingreso"], "A tiempo");
        assert_eq!(value["dispositivo"], "Porteria 1");
    }

    #[tokio::test]
    async fn test_submit_without_connection_fails() {
        let mock = MockConnector::new();
        let connection = Arc::new(PersistentConnection::new(
            mock.clone(),
            DEFAULT_CONNECT_TIMEOUT,
        ));
        let use_case = SubmitVisitUseCase::new(connection);

        let result = use_case.submit(&record(), &details()).await;

        assert!(matches!(
            result,
            Err(SubmitError::Connection(ConnectionError::NotConnected))
        ));
        assert!(mock.sent_lines().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_surfaces_as_transmission_error() {
        let mock = MockConnector::new();
        let use_case = SubmitVisitUseCase::new(connected(&mock).await);
        mock.set_fail_writes(true);

        let result = use_case.submit(&record(), &details()).await;

        assert!(matches!(
            result,
            Err(SubmitError::Connection(ConnectionError::Transmission(_)))
        ));
    }
}
