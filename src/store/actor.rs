use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::{path, Document, SetOptions, StoreError};

pub type StoreResponse<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests understood by [`StoreActor`]. Each carries its own reply channel.
#[derive(Debug)]
pub enum StoreRequest {
    Get {
        path: String,
        respond_to: StoreResponse<Option<Document>>,
    },
    Set {
        path: String,
        data: Value,
        options: SetOptions,
        respond_to: StoreResponse<u64>,
    },
    Delete {
        path: String,
        respond_to: StoreResponse<()>,
    },
    List {
        collection: String,
        respond_to: StoreResponse<Vec<Document>>,
    },
    Subscribe {
        collection: String,
        respond_to: StoreResponse<watch::Receiver<Vec<Document>>>,
    },
    ListenerCount {
        collection: String,
        respond_to: StoreResponse<usize>,
    },
    Shutdown,
}

// =============================================================================
// STORE ACTOR
// =============================================================================

pub struct StoreActor {
    name: &'static str,
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, BTreeMap<String, Document>>,
    /// Last version handed out per document path. Survives deletes so a
    /// re-created document never reuses a version a stale writer may hold.
    versions: HashMap<String, u64>,
    listeners: HashMap<String, watch::Sender<Vec<Document>>>,
}

impl StoreActor {
    pub fn new(name: &'static str, buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            name,
            receiver,
            collections: HashMap::new(),
            versions: HashMap::new(),
            listeners: HashMap::new(),
        };
        (actor, StoreClient::new(sender))
    }

    #[instrument(name = "store", fields(store = self.name), skip(self))]
    pub async fn run(mut self) {
        info!("Store starting");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Get { path, respond_to } => {
                    let _ = respond_to.send(self.handle_get(&path));
                }
                StoreRequest::Set {
                    path,
                    data,
                    options,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.handle_set(&path, data, options));
                }
                StoreRequest::Delete { path, respond_to } => {
                    let _ = respond_to.send(self.handle_delete(&path));
                }
                StoreRequest::List {
                    collection,
                    respond_to,
                } => {
                    let result = path::validate_collection(&collection)
                        .map(|_| self.snapshot(&collection));
                    let _ = respond_to.send(result);
                }
                StoreRequest::Subscribe {
                    collection,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.handle_subscribe(collection));
                }
                StoreRequest::ListenerCount {
                    collection,
                    respond_to,
                } => {
                    self.prune_listeners();
                    let count = self
                        .listeners
                        .get(&collection)
                        .map_or(0, |sender| sender.receiver_count());
                    let _ = respond_to.send(Ok(count));
                }
                StoreRequest::Shutdown => {
                    info!("Store shutting down");
                    break;
                }
            }
        }

        info!("Store stopped");
    }

    fn handle_get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let (collection, id) = path::split_document(path)?;
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    #[instrument(skip_all, fields(path = %path, merge = options.merge))]
    fn handle_set(
        &mut self,
        path: &str,
        data: Value,
        options: SetOptions,
    ) -> Result<u64, StoreError> {
        let (collection, id) = path::split_document(path)?;
        if !data.is_object() {
            return Err(StoreError::NotAnObject(path.to_string()));
        }

        let docs = self.collections.entry(collection.to_string()).or_default();
        let current = docs.get(id);
        let actual = current.map_or(0, |doc| doc.version);

        if let Some(expected) = options.expected_version {
            if expected != actual {
                debug!(expected, actual, "Rejecting stale write");
                return Err(StoreError::Conflict {
                    path: path.to_string(),
                    expected,
                    actual,
                });
            }
        }

        let data = match current {
            Some(existing) if options.merge => merge_fields(&existing.data, data),
            _ => data,
        };

        let last = self.versions.entry(path.to_string()).or_insert(0);
        *last += 1;
        let version = *last;
        docs.insert(
            id.to_string(),
            Document {
                id: id.to_string(),
                path: path.to_string(),
                version,
                data,
            },
        );
        debug!(version, "Document written");

        self.publish(collection);
        Ok(version)
    }

    fn handle_delete(&mut self, path: &str) -> Result<(), StoreError> {
        let (collection, id) = path::split_document(path)?;
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));

        match removed {
            Some(_) => {
                debug!(path, "Document deleted");
                self.publish(collection);
                Ok(())
            }
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn handle_subscribe(
        &mut self,
        collection: String,
    ) -> Result<watch::Receiver<Vec<Document>>, StoreError> {
        path::validate_collection(&collection)?;
        self.prune_listeners();

        if let Some(sender) = self.listeners.get(&collection) {
            return Ok(sender.subscribe());
        }

        let (sender, receiver) = watch::channel(self.snapshot(&collection));
        debug!(collection = %collection, "Listener channel opened");
        self.listeners.insert(collection, sender);
        Ok(receiver)
    }

    /// Pushes the full collection to its listeners, dropping the channel once
    /// nobody is listening any more.
    fn publish(&mut self, collection: &str) {
        let Some(sender) = self.listeners.get(collection) else {
            return;
        };

        if sender.receiver_count() == 0 {
            debug!(collection, "Listener channel closed");
            self.listeners.remove(collection);
            return;
        }

        sender.send_replace(self.snapshot(collection));
    }

    /// Drops listener channels whose receivers are all gone.
    fn prune_listeners(&mut self) {
        self.listeners.retain(|collection, sender| {
            let live = sender.receiver_count() > 0;
            if !live {
                debug!(collection = %collection, "Listener channel closed");
            }
            live
        });
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn merge_fields(existing: &Value, incoming: Value) -> Value {
    let mut merged = existing.clone();
    if let (Some(target), Value::Object(fields)) = (merged.as_object_mut(), incoming) {
        for (key, value) in fields {
            target.insert(key, value);
        }
    } else {
        warn!("Merge skipped on non-object document");
    }
    merged
}

// =============================================================================
// STORE CLIENT
// =============================================================================

/// Generate store client methods with oneshot channel boilerplate and tracing.
macro_rules! store_method {
    (fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as StoreRequest::$variant:ident $(, skip($($skip:ident),*))?) => {
        #[instrument(skip(self $($(, $skip)*)?))]
        pub async fn $method(&self, $($param: $param_type),*) -> Result<$return_type, StoreError> {
            debug!("Sending request");
            let (respond_to, response) = oneshot::channel();
            self.sender
                .send(StoreRequest::$variant { $($param,)* respond_to })
                .await
                .map_err(|_| StoreError::Unavailable("store closed".to_string()))?;

            response
                .await
                .map_err(|_| StoreError::Unavailable("store dropped the request".to_string()))?
        }
    };
}

/// Cheap, cloneable handle to a [`StoreActor`].
#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub(crate) fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    store_method!(fn get_document(path: String) -> Option<Document> as StoreRequest::Get);
    store_method!(fn delete_document(path: String) -> () as StoreRequest::Delete);
    store_method!(fn list_documents(collection: String) -> Vec<Document> as StoreRequest::List);
    store_method!(fn subscribe(collection: String) -> watch::Receiver<Vec<Document>> as StoreRequest::Subscribe);
    store_method!(fn listener_count(collection: String) -> usize as StoreRequest::ListenerCount);
    store_method!(fn set_document(path: String, data: Value, options: SetOptions) -> u64 as StoreRequest::Set, skip(data));

    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Sending shutdown request");
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|_| StoreError::Unavailable("store closed".to_string()))
    }
}
