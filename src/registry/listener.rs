use async_trait::async_trait;
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Bounds every emitted payload must meet
///
/// The payload is the "argument list" of an emission and is handed to every
/// listener verbatim; pick a tuple, a struct or `Vec<serde_json::Value>`.
pub trait Payload: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Payload for T {}

/// Errors a listener may report back to the registry
///
/// Emission captures these and logs them. They never reach the caller of
/// `emit`, and one failing listener never stops the others from running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("Listener failed: {0}")]
    Failed(String),

    #[error("Listener panicked: {0}")]
    Panicked(String),
}

impl ListenerError {
    /// Create a failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        ListenerError::Failed(msg.into())
    }
}

/// Trait for callbacks that can be registered against an event
///
/// Identity is the `Arc` holding the listener: registering the same
/// [`ListenerRef`] twice creates two records, and removal matches on the
/// reference, never on the name.
#[async_trait]
pub trait Listener<A: Payload>: Send + Sync {
    /// React to one emission of the event this listener is registered on
    async fn call(&self, args: &A) -> Result<(), ListenerError>;

    /// Get a human-readable name for this listener (for logging/debugging)
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Shared handle to a listener; the pointer is the listener's identity
pub type ListenerRef<A> = Arc<dyn Listener<A>>;

/// Whether two handles point at the same listener
pub fn same_listener<A: Payload>(a: &ListenerRef<A>, b: &ListenerRef<A>) -> bool {
    Arc::ptr_eq(a, b)
}

/// Closure-backed listener
///
/// Wraps `F: Fn(A) -> Fut`; the payload is cloned into each call so the
/// returned future can own it.
pub struct ListenerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ListenerFn<F> {
    pub fn new<A, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        A: Payload + Clone,
        F: Fn(A) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), ListenerError>> + Send,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the listener and returns it as a shared handle
    ///
    /// ```
    /// use listener_registry::{ListenerFn, ListenerRef};
    ///
    /// let greet: ListenerRef<String> = ListenerFn::arc("greet", |who: String| async move {
    ///     println!("hello, {}", who);
    ///     Ok(())
    /// });
    /// assert_eq!(greet.name(), "greet");
    /// ```
    pub fn arc<A, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        A: Payload + Clone,
        F: Fn(A) -> Fut + Send + Sync,
        Fut: Future<Output = Result<(), ListenerError>> + Send,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<A, F, Fut> Listener<A> for ListenerFn<F>
where
    A: Payload + Clone,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ListenerError>> + Send,
{
    async fn call(&self, args: &A) -> Result<(), ListenerError> {
        (self.f)(args.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_listener_fn_forwards_payload() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        let listener = ListenerFn::arc("adder", move |value: u32| {
            let seen = seen_clone.clone();
            async move {
                seen.fetch_add(value, Ordering::Relaxed);
                Ok(())
            }
        });

        listener.call(&5_u32).await.unwrap();
        listener.call(&7_u32).await.unwrap();

        assert_eq!(seen.load(Ordering::Relaxed), 12);
        assert_eq!(Listener::<u32>::name(listener.as_ref()), "adder");
    }

    #[tokio::test]
    async fn test_listener_fn_reports_failure() {
        let listener = ListenerFn::arc("broken", |_: ()| async {
            Err(ListenerError::failed("boom"))
        });

        let result = listener.call(&()).await;
        assert_eq!(result, Err(ListenerError::Failed("boom".to_string())));
    }

    #[test]
    fn test_identity_is_the_reference() {
        let a: ListenerRef<()> = ListenerFn::arc("same", |_: ()| async { Ok(()) });
        let b: ListenerRef<()> = ListenerFn::arc("same", |_: ()| async { Ok(()) });
        let a_again = a.clone();

        assert!(same_listener(&a, &a_again));
        assert!(!same_listener(&a, &b));
    }
}
