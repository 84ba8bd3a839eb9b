//! Best-effort signing provenance: public IP and a coarse location.
//!
//! Both lookups are optional and each is bounded by the collector's timeout
//! (under the `server` feature). A failed or slow lookup only drops its field;
//! signing never fails because of provenance.
//!
//! With the `wasm` feature the lookup traits drop their `Send + Sync` bounds
//! so they can wrap browser futures. Implementations must use the same
//! `async_trait` flavour as the traits:
//!
//! ```ignore
//! #[cfg_attr(feature = "wasm", async_trait(?Send))]
//! #[cfg_attr(not(feature = "wasm"), async_trait)]
//! impl IpLookup for MyLookup { /* ... */ }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared_types::{LocationData, Provenance};
use tracing::{debug, warn};

use crate::error::ProvenanceError;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(3000);

/// `Send + Sync` on native hosts, nothing in the browser.
#[cfg(not(feature = "wasm"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(feature = "wasm"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

#[cfg(feature = "wasm")]
pub trait MaybeSendSync {}
#[cfg(feature = "wasm")]
impl<T: ?Sized> MaybeSendSync for T {}

/// Resolves the signer's public IP address.
#[cfg_attr(feature = "wasm", async_trait(?Send))]
#[cfg_attr(not(feature = "wasm"), async_trait)]
pub trait IpLookup: MaybeSendSync {
    async fn public_ip(&self) -> Result<String, ProvenanceError>;
}

/// Resolves a coarse location, from the IP when one is known.
#[cfg_attr(feature = "wasm", async_trait(?Send))]
#[cfg_attr(not(feature = "wasm"), async_trait)]
pub trait Geolocator: MaybeSendSync {
    async fn locate(&self, ip: Option<&str>) -> Result<LocationData, ProvenanceError>;
}

#[derive(Clone)]
pub struct ProvenanceCollector {
    ip: Option<Arc<dyn IpLookup>>,
    geo: Option<Arc<dyn Geolocator>>,
    timeout: Duration,
}

impl Default for ProvenanceCollector {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for ProvenanceCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvenanceCollector")
            .field("ip", &self.ip.is_some())
            .field("geo", &self.geo.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProvenanceCollector {
    /// Collector that records only the user agent.
    pub fn disabled() -> Self {
        Self {
            ip: None,
            geo: None,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn new(ip: Arc<dyn IpLookup>, geo: Arc<dyn Geolocator>, timeout: Duration) -> Self {
        Self {
            ip: Some(ip),
            geo: Some(geo),
            timeout,
        }
    }

    pub fn with_ip_lookup(mut self, ip: Arc<dyn IpLookup>) -> Self {
        self.ip = Some(ip);
        self
    }

    pub fn with_geolocator(mut self, geo: Arc<dyn Geolocator>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn collect(&self, user_agent: Option<&str>) -> Provenance {
        let ip_address = match &self.ip {
            Some(lookup) => match bounded(self.timeout, lookup.public_ip()).await {
                Ok(ip) => Some(ip),
                Err(e) => {
                    warn!(error = %e, "IP lookup failed, continuing without it");
                    None
                }
            },
            None => None,
        };

        let location = match &self.geo {
            Some(geo) => match bounded(self.timeout, geo.locate(ip_address.as_deref())).await {
                Ok(loc) => Some(loc),
                Err(e) => {
                    warn!(error = %e, "Geolocation failed, continuing without it");
                    None
                }
            },
            None => None,
        };

        debug!(
            has_ip = ip_address.is_some(),
            has_location = location.is_some(),
            "Collected provenance"
        );
        Provenance {
            ip_address,
            location,
            user_agent: user_agent
                .map(str::trim)
                .filter(|ua| !ua.is_empty())
                .map(str::to_string),
        }
    }
}

#[cfg(feature = "server")]
async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, ProvenanceError>
where
    F: Future<Output = Result<T, ProvenanceError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ProvenanceError::Timeout(limit)),
    }
}

#[cfg(not(feature = "server"))]
async fn bounded<T, F>(_limit: Duration, fut: F) -> Result<T, ProvenanceError>
where
    F: Future<Output = Result<T, ProvenanceError>>,
{
    fut.await
}


#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;

    #[tokio::test]
    async fn collects_ip_and_location() {
        let collector = ProvenanceCollector::new(
            Arc::new(FixedIp("203.0.113.7")),
            Arc::new(Toronto),
            Duration::from_millis(500),
        );
        let p = collector.collect(Some("Mozilla/5.0")).await;
        assert_eq!(p.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(
            p.location.and_then(|l| l.display()).as_deref(),
            Some("Toronto, Canada")
        );
        assert_eq!(p.user_agent.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn failed_ip_degrades_both_fields() {
        let collector = ProvenanceCollector::new(
            Arc::new(FailingIp),
            Arc::new(Toronto),
            Duration::from_millis(500),
        );
        let p = collector.collect(None).await;
        assert_eq!(p, Provenance::default());
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn slow_lookup_times_out() {
        let collector = ProvenanceCollector::disabled()
            .with_ip_lookup(Arc::new(SlowIp))
            .with_timeout(Duration::from_millis(100));
        let p = collector.collect(Some("  ")).await;
        assert_eq!(p.ip_address, None);
        assert_eq!(p.user_agent, None);
    }

    #[tokio::test]
    async fn disabled_collector_keeps_user_agent() {
        let p = ProvenanceCollector::default().collect(Some("curl/8")).await;
        assert_eq!(p.ip_address, None);
        assert_eq!(p.location, None);
        assert_eq!(p.user_agent.as_deref(), Some("curl/8"));
    }

    #[cfg(not(feature = "wasm"))]
    #[test]
    fn native_collector_is_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProvenanceCollector>();
    }

    #[cfg(feature = "wasm")]
    #[tokio::test]
    async fn browser_lookups_need_not_be_send() {
        use std::rc::Rc;

        struct LocalIp(Rc<str>);

        #[async_trait(?Send)]
        impl IpLookup for LocalIp {
            async fn public_ip(&self) -> Result<String, ProvenanceError> {
                let ip = Rc::clone(&self.0);
                std::future::ready(()).await;
                Ok(ip.to_string())
            }
        }

        let collector =
            ProvenanceCollector::disabled().with_ip_lookup(Arc::new(LocalIp("198.51.100.4".into())));
        let p = collector.collect(None).await;
        assert_eq!(p.ip_address.as_deref(), Some("198.51.100.4"));
    }
}
