//! The downstream client contract.

use crate::error::Result;
use crate::result::QueryResult;
use async_trait::async_trait;

/// A transactional query executor owned by exactly one player.
///
/// The implementation set is closed: [`LiveDbClient`] executes
/// against MySQL, [`DryRunClient`] renders the SQL it would have
/// executed to a sink. All operations block the owning task; there is
/// no pooling.
///
/// [`LiveDbClient`]: crate::live::LiveDbClient
/// [`DryRunClient`]: crate::dryrun::DryRunClient
#[async_trait]
pub trait DbClient: Send {
    /// Establish the underlying connection.
    async fn connect(&mut self) -> Result<()>;

    /// Open a transaction.
    async fn begin(&mut self) -> Result<()>;

    /// Commit the open transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the open transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Release the connection. Idempotent.
    async fn close(&mut self) -> Result<()>;

    /// Execute one statement.
    ///
    /// `maxrows == 0` means unbounded; a result set larger than a
    /// non-zero `maxrows` is an error. `want_fields` controls whether
    /// column names are populated in the result.
    async fn execute(
        &mut self,
        query: &str,
        maxrows: usize,
        want_fields: bool,
    ) -> Result<QueryResult>;
}
