//! Cancellation of in-flight remote calls.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, OpContext, ReconcileError};

/// Runs one remote call, racing it against the caller's token.
///
/// A token that is already cancelled short-circuits before the call is issued.
pub(crate) async fn call<T, F>(
    cancel: &CancellationToken,
    context: &OpContext,
    request: F,
) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    ensure_live(cancel, context)?;
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReconcileError::Cancelled { context: context.clone() }),
        result = request => result.map_err(|source| ReconcileError::remote(context.clone(), source)),
    }
}

/// Fails with [`ReconcileError::Cancelled`] once the token has fired.
pub(crate) fn ensure_live(cancel: &CancellationToken, context: &OpContext) -> Result<(), ReconcileError> {
    if cancel.is_cancelled() {
        return Err(ReconcileError::Cancelled {
            context: context.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Phase, ResourceKind};

    fn ctx() -> OpContext {
        OpContext::new(ResourceKind::Account, "acc-1", Phase::Read)
    }

    #[tokio::test]
    async fn test_call_passes_result_through() {
        let token = CancellationToken::new();
        let ok = call(&token, &ctx(), async { Ok::<_, ClientError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = call(&token, &ctx(), async {
            Err::<(), _>(ClientError::NotFound("gone".into()))
        })
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let err = call(&token, &ctx(), async { Ok::<_, ClientError>(7) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_call() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });
        let err = call(&token, &ctx(), std::future::pending::<Result<(), ClientError>>())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
