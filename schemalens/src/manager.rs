use crate::adapter::{Adapter, AdapterError, redact_connection_string};

#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("adapter {0} is already connected; close it first")]
    AlreadyConnected(String),
    #[error("no registered adapter accepts the connection string")]
    NoCompatibleAdapter,
    #[error("{signature} failed to connect: {source}")]
    Connect {
        signature: String,
        #[source]
        source: AdapterError,
    },
    #[error("no active connection")]
    NoActiveConnection,
    #[error("{signature} failed to close: {source}")]
    Close {
        signature: String,
        #[source]
        source: AdapterError,
    },
}

/// Registry of adapters plus the single active connection.
///
/// Adapters are tried in registration order. Registering a signature that is
/// already present replaces the earlier adapter in place.
pub struct AdapterManager {
    adapters: Vec<Box<dyn Adapter>>,
    active: Option<String>,
}

impl AdapterManager {
    pub fn new(adapters: Vec<Box<dyn Adapter>>) -> Self {
        let mut manager = Self {
            adapters: Vec::with_capacity(adapters.len()),
            active: None,
        };
        for adapter in adapters {
            manager.register(adapter);
        }
        manager
    }

    pub fn register(&mut self, adapter: Box<dyn Adapter>) {
        let signature = adapter.identity().signature();
        match self.position(&signature) {
            Some(idx) => self.adapters[idx] = adapter,
            None => self.adapters.push(adapter),
        }
    }

    pub fn signatures(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.identity().signature())
            .collect()
    }

    fn position(&self, signature: &str) -> Option<usize> {
        self.adapters
            .iter()
            .position(|a| a.identity().signature() == signature)
    }

    fn active_position(&self) -> Option<usize> {
        self.active.as_deref().and_then(|s| self.position(s))
    }

    /// Connect through the first adapter that accepts `conn`.
    pub async fn connect(&mut self, conn: &str) -> Result<&mut dyn Adapter, ManagerError> {
        if let Some(idx) = self.active_position()
            && self.adapters[idx].is_connected()
        {
            return Err(ManagerError::AlreadyConnected(
                self.adapters[idx].identity().signature(),
            ));
        }

        let idx = self
            .adapters
            .iter()
            .position(|a| a.is_compatible(conn))
            .ok_or(ManagerError::NoCompatibleAdapter)?;
        let signature = self.adapters[idx].identity().signature();

        tracing::info!(
            adapter = %signature,
            conn = %redact_connection_string(conn),
            "Connecting"
        );
        self.adapters[idx]
            .connect(conn)
            .await
            .map_err(|source| ManagerError::Connect {
                signature: signature.clone(),
                source,
            })?;

        self.active = Some(signature);
        Ok(self.adapters[idx].as_mut())
    }

    /// Close the active connection and clear the active slot.
    pub async fn close(&mut self) -> Result<(), ManagerError> {
        let idx = self
            .active_position()
            .filter(|&idx| self.adapters[idx].is_connected());
        let signature = self.active.take();
        let (Some(idx), Some(signature)) = (idx, signature) else {
            return Err(ManagerError::NoActiveConnection);
        };

        self.adapters[idx]
            .close()
            .await
            .map_err(|source| ManagerError::Close {
                signature: signature.clone(),
                source,
            })?;
        tracing::info!(adapter = %signature, "Connection closed");
        Ok(())
    }

    pub fn active_adapter(&self) -> Option<&dyn Adapter> {
        self.active_position().map(|idx| self.adapters[idx].as_ref())
    }

    pub fn active_adapter_mut(&mut self) -> Option<&mut dyn Adapter> {
        let idx = self.active_position()?;
        Some(self.adapters[idx].as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterIdentity;
    use crate::catalog::MappedDatabase;
    use crate::model::Database;

    /// Accepts `<scheme>://...`; connecting to a string containing `fail` errors.
    struct FakeAdapter {
        name: &'static str,
        scheme: &'static str,
        connected: bool,
    }

    impl FakeAdapter {
        fn boxed(name: &'static str, scheme: &'static str) -> Box<dyn Adapter> {
            Box::new(Self {
                name,
                scheme,
                connected: false,
            })
        }
    }

    #[async_trait::async_trait]
    impl Adapter for FakeAdapter {
        fn identity(&self) -> AdapterIdentity {
            AdapterIdentity::new(self.name, "v1")
        }

        fn is_compatible(&self, conn: &str) -> bool {
            conn.starts_with(&format!("{}://", self.scheme))
        }

        async fn connect(&mut self, conn: &str) -> Result<(), AdapterError> {
            if conn.contains("fail") {
                return Err(AdapterError::Connect("refused".into()));
            }
            self.connected = true;
            Ok(())
        }

        async fn close(&mut self) -> Result<(), AdapterError> {
            if !self.connected {
                return Err(AdapterError::NotConnected);
            }
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn map_database(&mut self) -> Result<MappedDatabase, AdapterError> {
            Ok(MappedDatabase {
                database: Database::new(self.name),
                errors: Vec::new(),
            })
        }
    }

    fn manager() -> AdapterManager {
        AdapterManager::new(vec![
            FakeAdapter::boxed("Alpha", "alpha"),
            FakeAdapter::boxed("Beta", "beta"),
        ])
    }

    #[tokio::test]
    async fn test_connect_picks_compatible_adapter() {
        let mut mgr = manager();
        let adapter = mgr.connect("beta://host/db").await.expect("beta should connect");
        assert_eq!(adapter.identity().signature(), "Beta-v1");
        assert!(adapter.is_connected());
        assert_eq!(
            mgr.active_adapter().map(|a| a.identity().signature()),
            Some("Beta-v1".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_compatible_adapter() {
        let mut mgr = manager();
        let err = mgr
            .connect("not a connection string")
            .await
            .err()
            .expect("nothing should accept the string");
        assert!(matches!(err, ManagerError::NoCompatibleAdapter));
        assert!(mgr.active_adapter().is_none(), "No adapter should become active");
    }

    #[tokio::test]
    async fn test_connect_while_connected_fails() {
        let mut mgr = manager();
        mgr.connect("alpha://one").await.unwrap();
        let err = mgr
            .connect("beta://two")
            .await
            .err()
            .expect("second connect should fail");
        assert!(matches!(err, ManagerError::AlreadyConnected(ref sig) if sig == "Alpha-v1"));
    }

    #[tokio::test]
    async fn test_connect_failure_names_adapter() {
        let mut mgr = manager();
        let err = mgr
            .connect("alpha://fail")
            .await
            .err()
            .expect("connect should fail");
        match err {
            ManagerError::Connect { signature, source } => {
                assert_eq!(signature, "Alpha-v1");
                assert!(matches!(source, AdapterError::Connect(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(mgr.active_adapter().is_none());
    }

    #[tokio::test]
    async fn test_close_clears_active_slot() {
        let mut mgr = manager();
        mgr.connect("alpha://one").await.unwrap();
        mgr.close().await.expect("close should succeed");
        assert!(mgr.active_adapter().is_none());

        let err = mgr.close().await.unwrap_err();
        assert!(matches!(err, ManagerError::NoActiveConnection));

        // A new connection is allowed after closing.
        assert!(mgr.connect("beta://two").await.is_ok());
    }

    #[tokio::test]
    async fn test_close_without_connection() {
        let mut mgr = manager();
        assert!(matches!(
            mgr.close().await,
            Err(ManagerError::NoActiveConnection)
        ));
    }

    #[tokio::test]
    async fn test_register_same_signature_replaces() {
        let mut mgr = manager();
        mgr.register(FakeAdapter::boxed("Alpha", "gamma"));

        assert_eq!(mgr.signatures(), vec!["Alpha-v1", "Beta-v1"]);
        assert!(mgr.connect("alpha://one").await.is_err());
        let adapter = mgr.connect("gamma://one").await.unwrap();
        assert_eq!(adapter.identity().signature(), "Alpha-v1");
    }

    #[tokio::test]
    async fn test_active_adapter_maps_database() {
        let mut mgr = manager();
        mgr.connect("alpha://one").await.unwrap();
        let mapped = mgr
            .active_adapter_mut()
            .expect("active adapter")
            .map_database()
            .await
            .unwrap();
        assert_eq!(mapped.database.name(), "Alpha");
    }
}
