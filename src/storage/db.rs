//! Database persistence layer using Sled
//!
//! Each collection lives in its own sled database under a single value key.
//! Mutations go through `with_lock`, which holds one mutex across the whole
//! load, mutate, save cycle.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{de::DeserializeOwned, Serialize};
use sled::Db;
use thiserror::Error;

const VALUE_KEY: &str = "value";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// A persisted value of type `T`
pub struct Store<T> {
    db: Db,
    lock: Arc<Mutex<()>>,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            lock: Arc::clone(&self.lock),
            _value: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl<T> Store<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::from_db(sled::open(path)?))
    }

    /// In-memory database removed on drop
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::from_db(db))
    }

    fn from_db(db: Db) -> Self {
        Self {
            db,
            lock: Arc::new(Mutex::new(())),
            _value: PhantomData,
        }
    }

    /// Current value, or `T::default()` if nothing was saved yet
    pub fn load(&self) -> Result<T, StoreError> {
        match self.db.get(VALUE_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(T::default()),
        }
    }

    /// Overwrite the stored value
    pub fn save(&self, value: &T) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.write(value)
    }

    /// Atomic load, mutate, save.
    ///
    /// Nothing is written when `mutate` returns an error.
    pub fn with_lock<R, E, F>(&self, mutate: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut value = self.load()?;
        let result = mutate(&mut value)?;
        self.write(&value)?;

        Ok(result)
    }

    fn write(&self, value: &T) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value)?;
        self.db.insert(VALUE_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }
}
