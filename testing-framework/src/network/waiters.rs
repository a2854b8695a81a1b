use super::{NodeRpc, POLL_INTERVAL};
use anyhow::{bail, Context, Result};
use futures::future::try_join_all;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Current height of every node, queried concurrently
pub async fn heights<N: NodeRpc>(nodes: &[N]) -> Result<Vec<u64>> {
    try_join_all(nodes.iter().map(|node| node.get_height()))
        .await
        .context("Failed to query node heights")
}

/// Wait until every node is at or above `target`.
/// Returns the minimum height observed.
pub async fn wait_for_min_height<N: NodeRpc>(
    nodes: &[N],
    target: u64,
    timeout: Duration,
) -> Result<u64> {
    if nodes.is_empty() {
        bail!("No nodes to wait on");
    }

    let start = Instant::now();
    loop {
        let min = heights(nodes).await?.into_iter().min().unwrap_or_default();
        if min >= target {
            return Ok(min);
        }
        if start.elapsed() >= timeout {
            bail!(
                "Timeout waiting for height {}: minimum height {} after {:?}",
                target,
                min,
                timeout
            );
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Wait until all nodes report the same height, returning it
pub async fn wait_all_heights_equal<N: NodeRpc>(nodes: &[N], timeout: Duration) -> Result<u64> {
    if nodes.is_empty() {
        bail!("No nodes to wait on");
    }

    let start = Instant::now();
    loop {
        let heights = heights(nodes).await?;
        let first = heights[0];
        if heights.iter().all(|height| *height == first) {
            return Ok(first);
        }
        if start.elapsed() >= timeout {
            bail!(
                "Timeout waiting for heights to converge: {:?} after {:?}",
                heights,
                timeout
            );
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use vela_common::{
        api::daemon::SubmitTransactionResult,
        crypto::Address,
        transaction::Transaction,
    };

    struct MockNode {
        height: Mutex<u64>,
    }

    impl MockNode {
        fn new(height: u64) -> Arc<Self> {
            Arc::new(Self {
                height: Mutex::new(height),
            })
        }

        fn set_height(&self, height: u64) {
            *self.height.lock() = height;
        }
    }

    #[async_trait]
    impl NodeRpc for MockNode {
        async fn get_height(&self) -> Result<u64> {
            Ok(*self.height.lock())
        }

        async fn get_balance(&self, _address: &Address) -> Result<u128> {
            Ok(1_000_000)
        }

        async fn get_nonce(&self, _address: &Address) -> Result<u64> {
            Ok(0)
        }

        async fn submit_transaction(&self, tx: &Transaction) -> Result<SubmitTransactionResult> {
            Ok(SubmitTransactionResult {
                hash: tx.hash(),
                accepted: true,
            })
        }
    }

    #[tokio::test]
    async fn test_min_height_already_reached() {
        let nodes = vec![MockNode::new(5), MockNode::new(7)];
        let height = wait_for_min_height(&nodes, 5, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(height, 5);
    }

    #[tokio::test]
    async fn test_min_height_progresses() {
        let nodes = vec![MockNode::new(1), MockNode::new(1)];
        let laggard = nodes[1].clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            laggard.set_height(3);
        });
        nodes[0].set_height(3);

        let height = wait_for_min_height(&nodes, 3, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(height, 3);
    }

    #[tokio::test]
    async fn test_min_height_timeout() {
        let nodes = vec![MockNode::new(1)];
        let err = wait_for_min_height(&nodes, 10, Duration::from_millis(250))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timeout waiting for height 10"));
    }

    #[tokio::test]
    async fn test_heights_equal() {
        let nodes = vec![MockNode::new(4), MockNode::new(2)];
        let lagging = nodes[1].clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(150)).await;
            lagging.set_height(4);
        });

        let height = wait_all_heights_equal(&nodes, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(height, 4);
    }

    #[tokio::test]
    async fn test_empty_node_set() {
        let nodes: Vec<Arc<MockNode>> = Vec::new();
        assert!(wait_all_heights_equal(&nodes, Duration::from_secs(1))
            .await
            .is_err());
    }
}
