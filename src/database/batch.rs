use super::store::{DocumentStore, StoreError, WriteOp};

/// Limite de operações por commit aceito pelo banco hospedado
pub const PLATFORM_BATCH_CEILING: usize = 500;

/// Margem de segurança usada por padrão
pub const DEFAULT_BATCH_LIMIT: usize = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub commits: usize,
    pub operations: usize,
}

/// Acumula operações de escrita e faz commit automaticamente ao atingir o
/// limite. Nenhum commit passa de `limit` operações.
pub struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    limit: usize,
    pending: Vec<WriteOp>,
    summary: BatchSummary,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, limit: usize) -> Self {
        let limit = limit.clamp(1, PLATFORM_BATCH_CEILING);
        Self {
            store,
            limit,
            pending: Vec::with_capacity(limit),
            summary: BatchSummary::default(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub async fn push(&mut self, op: WriteOp) -> Result<(), StoreError> {
        self.pending.push(op);
        if self.pending.len() >= self.limit {
            log::warn!("⚠️  Batch limit ({}) reached, committing and starting new batch", self.limit);
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), StoreError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let ops = std::mem::take(&mut self.pending);
        let count = ops.len();
        self.store.commit(ops).await?;
        self.summary.commits += 1;
        self.summary.operations += count;
        Ok(())
    }

    /// Confirma o restante e retorna o resumo
    pub async fn finish(mut self) -> Result<BatchSummary, StoreError> {
        log::info!("💾 Committing final batch with {} operations", self.pending.len());
        self.flush().await?;
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    #[tokio::test]
    async fn test_flushes_at_limit_and_on_finish() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store, 3);
        for i in 0..7 {
            writer.push(WriteOp::delete("tasks", &format!("t{}", i))).await.unwrap();
        }
        assert_eq!(writer.pending(), 1);

        let summary = writer.finish().await.unwrap();
        assert_eq!(summary, BatchSummary { commits: 3, operations: 7 });
        assert_eq!(store.commit_sizes(), vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_finish_without_operations_commits_nothing() {
        let store = MemoryStore::new();
        let summary = BatchWriter::new(&store, 10).finish().await.unwrap();
        assert_eq!(summary.commits, 0);
        assert!(store.commit_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_clamped_to_platform_ceiling() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store, 10_000);
        for i in 0..1001 {
            writer.push(WriteOp::delete("tasks", &format!("t{}", i))).await.unwrap();
        }
        writer.finish().await.unwrap();
        assert_eq!(store.commit_sizes(), vec![500, 500, 1]);
    }
}
