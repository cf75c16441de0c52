use super::DbPool;
use crate::errors::StorageError;
use curator_core::errors::Result;
use diesel::SqliteConnection;
use log::error;
use std::any::Any;
use tokio::sync::{mpsc, oneshot};

// A write job runs against the writer's connection inside an immediate
// transaction and returns a core Result; an Err rolls the transaction back.
type Job<T> = Box<dyn FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static>;

type ErasedReply = Result<Box<dyn Any + Send + 'static>>;

/// Handle for sending jobs to the writer actor.
#[derive(Clone)]
pub struct WriteHandle {
    // Each job is type-erased to Box<dyn Any + Send>; the oneshot carries the reply.
    #[allow(clippy::type_complexity)]
    tx: mpsc::Sender<(Job<Box<dyn Any + Send + 'static>>, oneshot::Sender<ErasedReply>)>,
}

impl WriteHandle {
    /// Executes a database job on the writer actor's dedicated connection.
    ///
    /// Jobs run one at a time, in submission order, each in its own
    /// `BEGIN IMMEDIATE` transaction.
    pub async fn exec<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static + Any,
    {
        let (ret_tx, ret_rx) = oneshot::channel();

        self.tx
            .send((
                Box::new(move |c| job(c).map(|v| Box::new(v) as Box<dyn Any + Send>)),
                ret_tx,
            ))
            .await
            .map_err(|_| StorageError::WriterUnavailable("writer actor has stopped".to_string()))?;

        let boxed = ret_rx.await.map_err(|_| {
            StorageError::WriterUnavailable("writer actor dropped the reply".to_string())
        })??;

        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            StorageError::WriterUnavailable("unexpected writer reply type".to_string()).into()
        })
    }
}

/// Spawns a background Tokio task that acts as the single writer to the database.
/// The actor takes one connection from the pool per job and processes jobs serially.
pub fn spawn_writer(pool: DbPool) -> WriteHandle {
    let (tx, mut rx) =
        mpsc::channel::<(Job<Box<dyn Any + Send + 'static>>, oneshot::Sender<ErasedReply>)>(1024);

    tokio::spawn(async move {
        while let Some((job, reply_tx)) = rx.recv().await {
            let result: ErasedReply = match pool.get() {
                Ok(mut conn) => conn
                    .immediate_transaction::<_, StorageError, _>(|c| {
                        job(c).map_err(StorageError::from)
                    })
                    .map_err(|e: StorageError| e.into()),
                Err(e) => {
                    error!("Writer actor could not get a connection: {}", e);
                    Err(StorageError::from(e).into())
                }
            };

            // The requester may have gone away (cancelled request); nothing to do then.
            let _ = reply_tx.send(result);
        }
    });

    WriteHandle { tx }
}
