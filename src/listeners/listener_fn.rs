//! # Function-backed listeners (`ListenerFn`, `ListenerFnOf`)
//!
//! [`ListenerFn`] wraps a closure `F: Fn(Event) -> Fut`, producing a fresh future
//! per event. The closure receives its own clone of the event (the subject is
//! shared, so this is cheap), which keeps the future `'static`.
//!
//! [`ListenerFnOf`] is the typed variant: it downcasts the subject to `T` and calls
//! the closure with a [`TypedEvent<T>`]. Events carrying any other subject type are
//! ignored.
//!
//! ## Example
//! ```rust
//! use emitvisor::{Event, ListenerFn, ListenerFnOf, ListenerRef, TypedEvent};
//!
//! let any: ListenerRef = ListenerFn::arc("printer", |event: Event| async move {
//!     let _ = event.topic();
//! });
//!
//! let typed: ListenerRef = ListenerFnOf::arc("names", |event: TypedEvent<String>| async move {
//!     let _ = event.subject().len();
//! });
//!
//! assert_eq!(any.name(), "printer");
//! assert_eq!(typed.name(), "names");
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use tracing::trace;

use crate::events::{Event, TypedEvent};
use crate::listeners::listener::{Listener, ListenerRef};

/// Function-backed listener.
#[derive(Debug)]
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    /// Creates a new function-backed listener.
    ///
    /// Prefer [`ListenerFn::arc`] when you immediately need a [`ListenerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> ListenerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates the listener and returns it as a [`ListenerRef`] with a new identity.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> ListenerRef {
        ListenerRef::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Listener for ListenerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: &Event) {
        (self.f)(event.clone()).await;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Function-backed listener over a typed subject.
pub struct ListenerFnOf<T, F> {
    name: Cow<'static, str>,
    f: F,
    _subject: PhantomData<fn(T)>,
}

impl<T, F> ListenerFnOf<T, F> {
    /// Creates a new typed listener.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            _subject: PhantomData,
        }
    }
}

impl<T, F, Fut> ListenerFnOf<T, F>
where
    T: Any + Send + Sync,
    F: Fn(TypedEvent<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates the listener and returns it as a [`ListenerRef`] with a new identity.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> ListenerRef {
        ListenerRef::new(Self::new(name, f))
    }
}

#[async_trait]
impl<T, F, Fut> Listener for ListenerFnOf<T, F>
where
    T: Any + Send + Sync,
    F: Fn(TypedEvent<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, event: &Event) {
        let Some(typed) = event.typed::<T>() else {
            trace!(
                listener = %self.name,
                topic = event.topic(),
                expected = std::any::type_name::<T>(),
                "subject type mismatch, event ignored"
            );
            return;
        };
        (self.f)(typed).await;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
