use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension};

use super::{migrations::run_migrations, ConfigStore, StoreValue};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct StoreInner {
    sender: Mutex<mpsc::Sender<DbCommand>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            let sender = match self.sender.lock() {
                Ok(sender) => sender,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to store thread: {err}");
            }
            drop(sender);
            if let Err(join_err) = handle.join() {
                error!("Failed to join store thread: {join_err:?}");
            }
        }
    }
}

/// SQLite-backed settings store.
///
/// One connection lives on a dedicated thread; callers hand it closures over
/// a channel and block on the reply. Reads and writes are single-row, so the
/// round trip stays well under a millisecond.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<StoreInner>,
    db_path: Arc<PathBuf>,
}

impl SqliteStore {
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create store directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("brostop-store".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite store")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run store migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("Store initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Store thread shutting down");
            })
            .with_context(|| "failed to spawn store worker thread")?;

        ready_rx
            .recv()
            .context("store worker exited before signaling readiness")??;

        info!("Settings store opened at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: Mutex::new(command_tx),
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("Store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .lock()
            .map_err(|_| anyhow!("store sender lock poisoned"))?
            .send(command)
            .map_err(|err| anyhow!("failed to send command to store thread: {err}"))?;

        reply_rx
            .recv()
            .map_err(|_| anyhow!("store thread terminated unexpectedly"))?
    }
}

impl ConfigStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<StoreValue>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let raw: Option<String> = conn
                .query_row(
                    "SELECT value FROM settings WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .with_context(|| format!("failed to read setting {key}"))?;

            raw.map(|json| {
                serde_json::from_str::<StoreValue>(&json)
                    .with_context(|| format!("setting {key} holds malformed value"))
            })
            .transpose()
        })
    }

    fn put(&self, key: &str, value: StoreValue) -> Result<()> {
        let key = key.to_string();
        let json = serde_json::to_string(&value)?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, json, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write setting {key}"))?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM settings WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove setting {key}"))?;
            Ok(())
        })
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = prefix.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT key FROM settings
                 WHERE substr(key, 1, length(?1)) = ?1
                 ORDER BY key",
            )?;

            let keys = stmt
                .query_map(params![prefix], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(keys)
        })
    }
}
