//! Debounced auto-save of the board.
//!
//! Every committed change schedules a save; bursts of changes collapse into a
//! single write once the board has been quiet for the debounce delay. The host
//! calls [`AutoSaveManager::poll`] from its frame or timer callback and
//! [`AutoSaveManager::flush`] on teardown.

use crate::board::BoardDocument;
use crate::debounce::Debouncer;
use crate::storage::{Storage, StorageError, StorageResult};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Quiet period before a change is written.
pub const DEFAULT_SAVE_DEBOUNCE_MS: u64 = 500;

/// Key for the "last opened" board.
pub const LAST_BOARD_KEY: &str = "__last_board__";

/// Manages debounced board persistence.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    pending: Debouncer<String, BoardDocument>,
    last_save: Option<Instant>,
    /// Key the current board is stored under; defaults to the board id.
    current_board_id: Option<String>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_delay(storage, Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS))
    }

    pub fn with_delay(storage: Arc<S>, delay: Duration) -> Self {
        Self {
            storage,
            pending: Debouncer::new(delay),
            last_save: None,
            current_board_id: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.pending.delay()
    }

    pub fn set_board_id(&mut self, id: Option<String>) {
        self.current_board_id = id;
    }

    pub fn board_id(&self) -> Option<&str> {
        self.current_board_id.as_deref()
    }

    /// Whether a save is waiting to be written.
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    /// When the next pending save becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    fn key_for(&self, board: &BoardDocument) -> String {
        self.current_board_id.clone().unwrap_or_else(|| board.id.clone())
    }

    /// Record a change. The snapshot replaces any earlier pending one.
    pub fn schedule(&mut self, board: &BoardDocument, now: Instant) {
        let key = self.key_for(board);
        self.pending.schedule(key, board.clone(), now);
    }

    /// Write every save whose quiet period has elapsed. Returns how many were written.
    pub async fn poll(&mut self, now: Instant) -> StorageResult<usize> {
        let due = self.pending.due(now);
        self.write_all(due, now).await
    }

    /// Write everything pending immediately.
    pub async fn flush(&mut self) -> StorageResult<usize> {
        let all = self.pending.flush();
        self.write_all(all, Instant::now()).await
    }

    /// Save now, bypassing the debounce.
    pub async fn save(&mut self, board: &BoardDocument) -> StorageResult<()> {
        let key = self.key_for(board);
        self.pending.cancel(&key);
        self.write(&key, board).await?;
        self.last_save = Some(Instant::now());
        Ok(())
    }

    async fn write(&self, key: &str, board: &BoardDocument) -> StorageResult<()> {
        self.storage.save(key, board).await?;
        self.storage.save(LAST_BOARD_KEY, board).await
    }

    async fn write_all(&mut self, entries: Vec<(String, BoardDocument)>, now: Instant) -> StorageResult<usize> {
        let mut written = 0;
        let mut entries = entries.into_iter();
        while let Some((key, board)) = entries.next() {
            if let Err(e) = self.write(&key, &board).await {
                log::warn!("Auto-save of board {} failed: {}", key, e);
                // Keep the failed save and everything after it for the next attempt.
                self.pending.schedule(key, board, now);
                for (key, board) in entries {
                    self.pending.schedule(key, board, now);
                }
                return Err(e);
            }
            written += 1;
        }
        if written > 0 {
            self.last_save = Some(Instant::now());
            log::debug!("Auto-saved {} board(s)", written);
        }
        Ok(written)
    }

    /// Load a board by key and make it the current one.
    pub async fn load(&mut self, id: &str) -> StorageResult<BoardDocument> {
        let board = self.storage.load(id).await?;
        self.current_board_id = Some(id.to_string());
        Ok(board)
    }

    /// Restore the last opened board.
    ///
    /// Missing or unreadable state yields an empty board.
    pub async fn restore(&mut self) -> BoardDocument {
        match self.storage.load(LAST_BOARD_KEY).await {
            Ok(board) => {
                log::info!("Restored board {} with {} blocks", board.id, board.len());
                self.current_board_id = Some(board.id.clone());
                board
            }
            Err(StorageError::NotFound(_)) => {
                log::info!("No saved board, starting empty");
                BoardDocument::new()
            }
            Err(e) => {
                log::warn!("Could not restore board, starting empty: {}", e);
                BoardDocument::new()
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// List saved board keys, without the "last board" alias.
    pub async fn list_boards(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_BOARD_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// File storage in the platform data directory.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::block::{DEFAULT_BLOCK_SIZE, ExerciseType};
    use crate::storage::{BoxFuture, MemoryStorage};
    use kurbo::Point;
    use pollster::block_on;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn board_with_block() -> BoardDocument {
        let mut board = BoardDocument::new();
        board.add_block(ExerciseType::Matching, Point::ZERO, DEFAULT_BLOCK_SIZE);
        board
    }

    #[test]
    fn test_autosave_manager_creation() {
        let manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        assert!(!manager.is_dirty());
        assert_eq!(manager.delay(), Duration::from_millis(DEFAULT_SAVE_DEBOUNCE_MS));
    }

    #[test]
    fn test_poll_waits_for_quiet_period() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let start = Instant::now();
        let board = board_with_block();

        manager.schedule(&board, start);
        assert!(manager.is_dirty());
        assert_eq!(block_on(manager.poll(start + Duration::from_millis(100))).unwrap(), 0);
        assert!(!block_on(storage.exists(&board.id)).unwrap());

        assert_eq!(block_on(manager.poll(start + Duration::from_millis(600))).unwrap(), 1);
        assert!(!manager.is_dirty());
        assert_eq!(block_on(storage.load(&board.id)).unwrap(), board);
    }

    #[test]
    fn test_burst_collapses_to_latest() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let start = Instant::now();
        let mut board = BoardDocument::new();

        for i in 0..5 {
            board.add_block(ExerciseType::Matching, Point::new(i as f64 * 500.0, 0.0), DEFAULT_BLOCK_SIZE);
            manager.schedule(&board, start + Duration::from_millis(i * 100));
        }
        assert_eq!(block_on(manager.poll(start + Duration::from_millis(700))).unwrap(), 0);
        assert_eq!(block_on(manager.poll(start + Duration::from_millis(900))).unwrap(), 1);
        assert_eq!(block_on(storage.load(&board.id)).unwrap().len(), 5);
    }

    #[test]
    fn test_flush_writes_immediately() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let board = board_with_block();

        manager.schedule(&board, Instant::now());
        assert_eq!(block_on(manager.flush()).unwrap(), 1);
        assert!(block_on(storage.exists(LAST_BOARD_KEY)).unwrap());
        assert_eq!(block_on(manager.flush()).unwrap(), 0);
    }

    #[test]
    fn test_restore_last_board() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage.clone());
        let mut board = board_with_block();
        board.name = "Restored".to_string();
        block_on(manager.save(&board)).unwrap();

        let mut manager2 = AutoSaveManager::new(storage);
        let restored = block_on(manager2.restore());
        assert_eq!(restored.name, "Restored");
        assert_eq!(manager2.board_id(), Some(board.id.as_str()));
    }

    #[test]
    fn test_restore_without_saved_board_is_empty() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        assert!(block_on(manager.restore()).is_empty());
    }

    #[test]
    fn test_list_excludes_last_board_key() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(storage);
        block_on(manager.save(&BoardDocument::new())).unwrap();

        let list = block_on(manager.list_boards()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.contains(&LAST_BOARD_KEY.to_string()));
    }

    /// Storage whose writes fail until switched on.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        healthy: AtomicBool,
    }

    impl Storage for FlakyStorage {
        fn save(&self, id: &str, board: &BoardDocument) -> BoxFuture<'_, StorageResult<()>> {
            if self.healthy.load(Ordering::SeqCst) {
                self.inner.save(id, board)
            } else {
                Box::pin(async { Err(StorageError::Io("disk full".into())) })
            }
        }

        fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<BoardDocument>> {
            self.inner.load(id)
        }

        fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
            self.inner.delete(id)
        }

        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            self.inner.list()
        }

        fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
            self.inner.exists(id)
        }
    }

    #[test]
    fn test_failed_save_is_retried() {
        let storage = Arc::new(FlakyStorage::default());
        let mut manager = AutoSaveManager::new(storage.clone());
        let board = board_with_block();

        manager.schedule(&board, Instant::now());
        assert!(block_on(manager.flush()).is_err());
        assert!(manager.is_dirty());

        storage.healthy.store(true, Ordering::SeqCst);
        assert_eq!(block_on(manager.flush()).unwrap(), 1);
        assert!(block_on(storage.exists(&board.id)).unwrap());
    }
}
