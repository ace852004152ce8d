//! Resolver-backed [`TxtExchange`].

use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig},
    name_server::TokioConnectionProvider,
    proto::xfer::Protocol,
    Resolver, TokioResolver,
};
use tracing::debug;

use super::TxtExchange;

/// TXT lookups aimed straight at the controller.
///
/// The configured address is a literal resolver IP, not a delegated zone;
/// every query goes to it over plain UDP port 53.
pub struct DnsTxtExchange {
    resolver: TokioResolver,
}

impl DnsTxtExchange {
    pub fn new(server: IpAddr) -> Self {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(server, 53),
            Protocol::Udp,
        ));

        let mut builder =
            Resolver::builder_with_config(config, TokioConnectionProvider::default());
        // Tasking names repeat every poll, so cached answers would go stale;
        // retries live in LookupClient.
        builder.options_mut().cache_size = 0;
        builder.options_mut().attempts = 0;

        DnsTxtExchange {
            resolver: builder.build(),
        }
    }
}

#[async_trait]
impl TxtExchange for DnsTxtExchange {
    async fn query(&self, name: &str) -> Option<String> {
        match self.resolver.txt_lookup(name.to_string()).await {
            Ok(lookup) => {
                let record = lookup.iter().next()?;
                let first = record.txt_data().first()?;
                Some(String::from_utf8_lossy(first).into_owned())
            }
            Err(e) => {
                debug!(%name, error = %e, "lookup attempt failed");
                None
            }
        }
    }
}
