//! Defines the contracts between the cache and the resources it manages.
//!
//! A [Handle](Handle) wraps a resource which is expensive to open (most probably a file
//! descriptor along with some parsed metadata). The cache never knows how a handle is opened,
//! this is delegated to a [Factory](Factory) which is passed into every
//! [acquire](crate::cache::FileCache::acquire_with).
//!
//! While a handle is cached, it carries an [Owner](Owner). Calling [Handle::close] on such a
//! handle hands it back to the cache instead of closing it. Once the cache destroys the handle,
//! it first detaches the owner and then invokes **close** - which is then a real close.
//!
//! # Examples
//!
//! ```
//! # use filecache::handle::{Handle, Owner, OpenRequest, Factory};
//! # use parking_lot::Mutex;
//! struct Connection {
//!     location: String,
//!     owner: Mutex<Option<Owner>>,
//! }
//!
//! impl Handle for Connection {
//!     fn location(&self) -> &str {
//!         &self.location
//!     }
//!
//!     fn close(&self) -> anyhow::Result<()> {
//!         let owner = self.owner.lock().clone();
//!         if let Some(owner) = owner {
//!             if owner.release() {
//!                 return Ok(());
//!             }
//!         }
//!
//!         // Actually tear down the connection here...
//!         Ok(())
//!     }
//!
//!     fn set_owner(&self, owner: Option<Owner>) {
//!         *self.owner.lock() = owner;
//!     }
//! }
//!
//! // Any matching closure can be used as factory...
//! let factory = |request: &OpenRequest| -> anyhow::Result<Connection> {
//!     Ok(Connection {
//!         location: request.location().to_owned(),
//!         owner: Mutex::new(None),
//!     })
//! };
//!
//! let connection = factory.open(&OpenRequest::new("db://primary")).unwrap();
//! assert_eq!(connection.location(), "db://primary");
//! assert_eq!(connection.close().is_ok(), true);
//! ```
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

use tokio_util::sync::CancellationToken;

/// Describes a long-lived object which wraps a resource that is costly to open.
///
/// Implementations have to be thread safe, as a cached handle is shared between the cache and
/// the caller which currently holds it.
pub trait Handle: Send + Sync + 'static {
    /// Returns the location this handle has been opened for.
    fn location(&self) -> &str;

    /// Returns the last modification timestamp of the underlying resource.
    ///
    /// The cache records this value when the handle is opened and compares it on every reuse.
    /// If the value changed, the handle is considered stale and discarded. Returning **None**
    /// disables this check for the handle.
    fn last_modified(&self) -> Option<SystemTime> {
        None
    }

    /// Closes the handle.
    ///
    /// If an [Owner](Owner) is attached, the handle has to be given back via
    /// [Owner::release](Owner::release). Only if there is no owner (or if it rejects the handle)
    /// the underlying resource is actually closed.
    fn close(&self) -> anyhow::Result<()>;

    /// Temporarily releases the underlying OS resource while the handle sits idle in the cache.
    fn suspend(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Re-acquires the OS resource released by [suspend](Handle::suspend).
    ///
    /// If this fails, the cache discards the handle and opens a fresh one.
    fn resume(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Invoked by the cache once the handle is placed in a slot (**Some**) or once the slot
    /// is destroyed (**None**).
    fn set_owner(&self, _owner: Option<Owner>) {}
}

/// Implemented by caches which accept handles given back via an [Owner](Owner).
pub(crate) trait Release: Send + Sync {
    /// Returns **true** if the handle with the given identity has been taken care of.
    fn release_handle(&self, id: usize) -> bool;
}

/// Connects a cached handle to the cache which keeps it.
///
/// The owner only keeps a weak reference, therefore a handle never keeps a cache alive.
#[derive(Clone)]
pub struct Owner {
    cache: Weak<dyn Release>,
    id: usize,
}

impl Owner {
    pub(crate) fn new(cache: Weak<dyn Release>, id: usize) -> Self {
        Owner { cache, id }
    }

    /// Hands the handle back to its cache.
    ///
    /// Returns **false** if the cache is gone or if it doesn't know the handle (anymore). In this
    /// case the caller is responsible for actually closing the resource.
    pub fn release(&self) -> bool {
        match self.cache.upgrade() {
            Some(cache) => cache.release_handle(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner(#{:x})", self.id)
    }
}

/// Computes the identity of a handle, which is the address of its shared allocation.
pub(crate) fn identity<H>(handle: &Arc<H>) -> usize {
    Arc::as_ptr(handle).cast::<()>() as usize
}

/// Opens new handles when the cache cannot serve a request.
pub trait Factory<H: Handle>: Send + Sync {
    /// Opens a new handle for [OpenRequest::location](OpenRequest::location).
    ///
    /// # Errors
    /// Any error is reported back to the caller of the cache and nothing is cached.
    fn open(&self, request: &OpenRequest) -> anyhow::Result<H>;
}

impl<H, F> Factory<H> for F
where
    H: Handle,
    F: Fn(&OpenRequest) -> anyhow::Result<H> + Send + Sync,
{
    fn open(&self, request: &OpenRequest) -> anyhow::Result<H> {
        self(request)
    }
}

/// Describes what to open (and under which key to cache it).
///
/// # Examples
/// ```
/// # use filecache::handle::OpenRequest;
/// let request = OpenRequest::new("/data/sst.nc").with_hint(8192);
///
/// // Without an explicit key, the location is used...
/// assert_eq!(request.key(), "/data/sst.nc");
/// assert_eq!(request.hint(), Some(8192));
///
/// let request = request.with_key("sst");
/// assert_eq!(request.key(), "sst");
/// assert_eq!(request.location(), "/data/sst.nc");
/// ```
#[derive(Clone, Copy)]
pub struct OpenRequest<'a> {
    location: &'a str,
    key: Option<&'a str>,
    hint: Option<usize>,
    cancellation: Option<&'a CancellationToken>,
    extra: Option<&'a (dyn Any + Send + Sync)>,
}

impl<'a> OpenRequest<'a> {
    /// Creates a request for the given location.
    pub fn new(location: &'a str) -> Self {
        OpenRequest {
            location,
            key: None,
            hint: None,
            cancellation: None,
            extra: None,
        }
    }

    /// Specifies the cache key to use instead of the location.
    pub fn with_key(mut self, key: &'a str) -> Self {
        self.key = Some(key);
        self
    }

    /// Passes a hint (e.g. a buffer size) on to the factory.
    pub fn with_hint(mut self, hint: usize) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Attaches a token which permits to abandon the request once the handle has been opened.
    pub fn with_cancellation(mut self, token: &'a CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Passes an arbitrary value on to the factory.
    pub fn with_extra(mut self, extra: &'a (dyn Any + Send + Sync)) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Returns the location to open.
    pub fn location(&self) -> &'a str {
        self.location
    }

    /// Returns the cache key, which defaults to the location.
    pub fn key(&self) -> &'a str {
        self.key.unwrap_or(self.location)
    }

    /// Returns the hint given for the factory.
    pub fn hint(&self) -> Option<usize> {
        self.hint
    }

    /// Returns the cancellation token if one was attached.
    pub fn cancellation(&self) -> Option<&'a CancellationToken> {
        self.cancellation
    }

    /// Determines if the attached token (if any) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .map(|token| token.is_cancelled())
            .unwrap_or(false)
    }

    /// Returns the extra value if one is present and has the requested type.
    pub fn extra<T: Any>(&self) -> Option<&'a T> {
        self.extra.and_then(|extra| extra.downcast_ref::<T>())
    }
}

/// Reported by the cache if a request was cancelled right after its handle has been opened.
///
/// The freshly opened handle has already been closed in this case.
///
/// # Examples
/// ```
/// # use filecache::handle::Cancelled;
/// let error = anyhow::Error::new(Cancelled);
/// assert_eq!(error.is::<Cancelled>(), true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The request has been cancelled.")
    }
}

impl std::error::Error for Cancelled {}

#[cfg(test)]
mod tests {
    use crate::handle::{identity, OpenRequest};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn requests_report_cancellation() {
        let token = CancellationToken::new();
        let request = OpenRequest::new("a").with_cancellation(&token);
        assert_eq!(request.is_cancelled(), false);

        token.cancel();
        assert_eq!(request.is_cancelled(), true);
        assert_eq!(OpenRequest::new("a").is_cancelled(), false);
    }

    #[test]
    fn extras_are_downcast() {
        let buffer_size: u32 = 4096;
        let request = OpenRequest::new("a").with_extra(&buffer_size);

        assert_eq!(request.extra::<u32>(), Some(&4096));
        assert_eq!(request.extra::<String>().is_none(), true);
    }

    #[test]
    fn identities_follow_allocations() {
        let first = Arc::new(String::from("a"));
        let second = Arc::new(String::from("a"));

        assert_eq!(identity(&first), identity(&first.clone()));
        assert_ne!(identity(&first), identity(&second));
    }
}
