use std::sync::{Arc, Mutex};

/// A slot shared between tasks. `take()` hands the value to exactly one caller.
pub(crate) struct SharedOption<T> {
    data: Arc<Mutex<Option<T>>>,
}

// Derived Clone would require `T: Clone`.
impl<T> Clone for SharedOption<T> {
    fn clone(&self) -> Self {
        SharedOption {
            data: self.data.clone(),
        }
    }
}

impl<T> SharedOption<T> {
    pub(crate) fn new() -> Self {
        SharedOption {
            data: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn with(data: T) -> Self {
        SharedOption {
            data: Arc::new(Mutex::new(Some(data))),
        }
    }

    pub(crate) fn replace(&self, new_data: T) -> Option<T> {
        self.data
            .lock()
            .expect("SharedOption.replace() mutex guard poison")
            .replace(new_data)
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.data.lock().expect("SharedOption.take() mutex guard poison").take()
    }

    pub(crate) fn is_some(&self) -> bool {
        self.data.lock().expect("SharedOption.is_some() mutex guard poison").is_some()
    }
}
