//! `_minecraft._tcp` SRV resolution for addresses given without a port.

use mcwatch_shared::ServerAddress;
use std::cmp::Reverse;
use tracing::debug;
use trust_dns_resolver::error::ResolveError;
use trust_dns_resolver::TokioAsyncResolver;

/// One SRV answer, reduced to what target selection needs
#[derive(Debug, Clone, PartialEq, Eq)]
struct SrvRecord {
    priority: u16,
    weight: u16,
    target: String,
    port: u16,
}

/// Looks up SRV records, falling back to the plain host on port 25565
#[derive(Clone)]
pub struct SrvResolver {
    resolver: TokioAsyncResolver,
}

impl SrvResolver {
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    /// Resolver using the host's DNS configuration
    pub fn from_system_conf() -> Result<Self, ResolveError> {
        Ok(Self::new(TokioAsyncResolver::tokio_from_system_conf()?))
    }

    /// Host and port to connect to for `address`
    pub async fn resolve(&self, address: &ServerAddress) -> (String, u16) {
        if !address.wants_srv_lookup() {
            return (address.host().to_string(), address.port());
        }

        let query = format!("_minecraft._tcp.{}", address.host());
        let records: Vec<SrvRecord> = match self.resolver.srv_lookup(query.as_str()).await {
            Ok(lookup) => lookup
                .iter()
                .map(|srv| SrvRecord {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    target: srv.target().to_utf8(),
                    port: srv.port(),
                })
                .collect(),
            Err(e) => {
                debug!("No SRV record for {}: {}", address.host(), e);
                Vec::new()
            }
        };

        select_target(address, &records)
    }
}

/// Lowest priority wins, then highest weight. A root target means the
/// service is explicitly unavailable, which leaves the plain host.
fn select_target(address: &ServerAddress, records: &[SrvRecord]) -> (String, u16) {
    let best = records
        .iter()
        .filter(|r| r.target != "." && !r.target.is_empty())
        .min_by_key(|r| (r.priority, Reverse(r.weight)));

    match best {
        Some(record) => (
            record.target.trim_end_matches('.').to_string(),
            record.port,
        ),
        None => (address.host().to_string(), address.port()),
    }
}
