//! External filesystem/tool bridge.

use async_trait::async_trait;

use crate::error::Result;

/// Bridge giving the model access to filesystem tools. Discovery and
/// execution live on the other side; the service only needs the
/// connection to be up before streaming. Connection failures feed the
/// same classify/retry path as streaming failures.
#[async_trait]
pub trait ToolBridge: Send + Sync {
    /// Establish the connection if it is not already up.
    async fn ensure_connection(&self) -> Result<()>;

    fn is_connected(&self) -> bool;
}
