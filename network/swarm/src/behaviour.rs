//   Copyright 2023 The Tari Project
//   SPDX-License-Identifier: BSD-3-Clause

use std::collections::HashSet;

use libp2p::{
    connection_limits,
    connection_limits::ConnectionLimits,
    identify,
    identity::Keypair,
    multiaddr::Protocol,
    noise,
    ping,
    swarm::NetworkBehaviour,
    tcp,
    tls,
    yamux,
    Multiaddr,
    StreamProtocol,
    Swarm,
    SwarmBuilder,
};
use libp2p_substream as substream;

use crate::{config::Config, error::SpookSwarmError};

#[derive(NetworkBehaviour)]
pub struct SpookBehaviour {
    pub ping: ping::Behaviour,
    pub connection_limits: connection_limits::Behaviour,
    pub identify: identify::Behaviour,
    pub substream: substream::Behaviour,
}

/// Returns true if the given Multiaddr can be dialed by the spook swarm, otherwise false.
/// Only TCP (over IP or DNS) is supported; onion addresses are always rejected.
pub fn is_supported_multiaddr(addr: &Multiaddr) -> bool {
    let mut has_tcp = false;
    for p in addr {
        match p {
            Protocol::Onion(_, _) | Protocol::Onion3(_) => return false,
            Protocol::Tcp(_) => has_tcp = true,
            _ => {},
        }
    }
    has_tcp
}

/// Creates a swarm that only dials out. Connections are secured with TLS or noise, whichever the remote selects. No listener is started and relaying is not offered. Inbound substreams for
/// `supported_protocols` are surfaced by the substream behaviour once a connection is up.
pub fn create_swarm(
    identity: Keypair,
    supported_protocols: HashSet<StreamProtocol>,
    config: Config,
) -> Result<Swarm<SpookBehaviour>, SpookSwarmError> {
    let swarm = SwarmBuilder::with_existing_identity(identity)
        .with_tokio()
        .with_tcp(
            tcp::Config::new().nodelay(true),
            (tls::Config::new, noise::Config::new),
            yamux::Config::default,
        )
        .map_err(|e| SpookSwarmError::Security(e.to_string()))?
        .with_dns()?
        .with_behaviour(|keypair| {
            // Ping
            let ping = ping::Behaviour::new(config.ping.clone());

            // Identify
            let identify = identify::Behaviour::new(
                identify::Config::new(config.protocol_version.clone(), keypair.public())
                    .with_interval(config.identify_interval)
                    .with_agent_version(config.user_agent.clone()),
            );

            // Connection limits
            let connection_limits = connection_limits::Behaviour::new(
                ConnectionLimits::default().with_max_established_per_peer(config.max_connections_per_peer),
            );

            // Substreams
            let substream = substream::Behaviour::new(supported_protocols, config.substream.clone());

            SpookBehaviour {
                ping,
                connection_limits,
                identify,
                substream,
            }
        })
        .map_err(|e| SpookSwarmError::BehaviourError(e.to_string()))?
        .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(config.idle_connection_timeout))
        .build();

    Ok(swarm)
}
