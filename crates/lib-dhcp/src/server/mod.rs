use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

mod context;
mod response;
mod stats;

pub use context::*;
pub use stats::*;

use crate::classify::Classifier;
use crate::defs::OptionDefRegistry;
use crate::hooks::{CalloutHandle, CalloutStatus, HooksManager, HOOK_PKT4_RECEIVE, HOOK_PKT4_SEND};
use crate::nic::{OutPacket, RawPacket};
use crate::ping::AddressProber;
use crate::rpc::AddressAllocator;
use crate::subnet::{Subnet, SubnetRegistry, SubnetSelector};
use crate::types::option::code::{
    DHO_DHCP_AGENT_OPTIONS, DHO_DHCP_REQUESTED_ADDRESS, DHO_DHCP_SERVER_IDENTIFIER,
    DHO_SUBNET_SELECTION, RAI_OPTION_LINK_SELECTION,
};
use crate::types::{Message, MessageType};
use crate::{DECLINE_CONFLICT_XID, MAX_ALLOCATE_RETRY};

/// Sentinel-carrying egress queue: `None` tells the transmitter to stop.
pub type EgressSender = mpsc::Sender<Option<OutPacket>>;

/// The per-packet request processor. One instance is shared by all worker
/// tasks; every field is immutable at steady state.
#[derive(Clone)]
pub struct Dhcpv4Server {
    defs: Arc<OptionDefRegistry>,
    subnets: Arc<SubnetRegistry>,
    classifier: Arc<Classifier>,
    hooks: Arc<HooksManager>,
    allocator: Arc<dyn AddressAllocator>,
    prober: Arc<dyn AddressProber>,
    stats: Arc<ServerStats>,
    egress: EgressSender,
    /// Addresses this server answers for; used to vet inbound server-ids.
    server_ids: Arc<Vec<Ipv4Addr>>,
}

impl Dhcpv4Server {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        defs: Arc<OptionDefRegistry>,
        subnets: Arc<SubnetRegistry>,
        classifier: Arc<Classifier>,
        hooks: Arc<HooksManager>,
        allocator: Arc<dyn AddressAllocator>,
        prober: Arc<dyn AddressProber>,
        stats: Arc<ServerStats>,
        egress: EgressSender,
        server_ids: Vec<Ipv4Addr>,
    ) -> Self {
        Self {
            defs,
            subnets,
            classifier,
            hooks,
            allocator,
            prober,
            stats,
            egress,
            server_ids: Arc::new(server_ids),
        }
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Handle one datagram end to end: unpack, receive callouts, accept
    /// checks, classification, then dispatch on the message type. Address
    /// allocation continues on its own task so the calling worker returns
    /// to the queue immediately.
    pub async fn process_packet(&self, packet: RawPacket) {
        let mut query = match Message::unpack(&packet.data, &self.defs) {
            Ok(query) => query,
            Err(error) => {
                self.stats.count_dropped_malformed();
                warn!(%error, from = %packet.remote, "dropping malformed packet");
                return;
            }
        };
        query.iface = packet.iface.clone();
        query.local_addr = packet.local_addr;
        query.local_port = packet.local_port;
        query.remote_addr = *packet.remote.ip();
        query.remote_port = packet.remote.port();

        if self.hooks.callouts_present(HOOK_PKT4_RECEIVE) {
            let mut handle = CalloutHandle::new().with_query4(&mut query);
            self.hooks.call_callouts(HOOK_PKT4_RECEIVE, &mut handle);
            if handle.status() == CalloutStatus::Skip {
                debug!("pkt4_receive callout skipped the packet");
                return;
            }
        }

        if !self.accept(&query) {
            self.stats.count_dropped_not_accepted();
            return;
        }

        self.classifier.classify(&mut query);
        self.stats.count_recv();
        info!(%query, classes = %query.classes, "query");

        match query.message_type() {
            Some(MessageType::Discover) | Some(MessageType::Request) => {
                self.process_request(query, packet.iface_addr).await;
            }
            Some(MessageType::Release) => self.process_release(query).await,
            Some(MessageType::Decline) => self.process_decline(query).await,
            Some(MessageType::Inform) => self.process_inform(query).await,
            _ => {}
        }
    }

    async fn process_request(&self, query: Message, iface_addr: Ipv4Addr) {
        let query_type = query.message_type();

        if query_type == Some(MessageType::Discover)
            && query.get_option(DHO_DHCP_SERVER_IDENTIFIER).is_some()
        {
            warn!(label = %query.label(), "server-id option not expected in DHCPDISCOVER");
            self.stats.count_dropped_not_accepted();
            return;
        }
        if query.hwaddr.is_empty() && query.client_id().is_none() {
            warn!(label = %query.label(), "missing client-id and no hardware address");
            self.stats.count_dropped_not_accepted();
            return;
        }

        match self.select_subnet(&query, iface_addr) {
            Some(subnet) => {
                let subnet = subnet.clone();
                let server = self.clone();
                let ctx = ClientContext::new(query, subnet);
                tokio::spawn(async move { server.allocate_lease(ctx).await });
            }
            None => {
                warn!(label = %query.label(), "no subnet for discover or request");
                self.stats.count_dropped_no_subnet();
                if query_type == Some(MessageType::Request) {
                    self.deny_request(&query).await;
                }
            }
        }
    }

    /// The allocate, ping, assign pipeline. A ping conflict declines the
    /// address master-ward and retries the allocation, bounded by
    /// [`MAX_ALLOCATE_RETRY`].
    async fn allocate_lease(&self, mut ctx: ClientContext) {
        loop {
            if ctx.retry_count() > MAX_ALLOCATE_RETRY {
                warn!(label = %ctx.query().label(), "allocation retries exhausted");
                self.fail_allocation(ctx.query()).await;
                return;
            }

            let reply = match self.allocator.allocate(ctx.lease_request()).await {
                Ok(reply) => reply,
                Err(error) => {
                    warn!(label = %ctx.query().label(), %error, "allocation request failed");
                    self.fail_allocation(ctx.query()).await;
                    return;
                }
            };

            if reply.is_allocation_failure() {
                debug!(addr = %reply.addr_v4(), "master denied the allocation");
                self.fail_allocation(ctx.query()).await;
                return;
            }
            ctx.apply_reply(reply.addr_v4(), reply.subnet_id);

            let wants_probe = ctx.query_type() == Some(MessageType::Discover)
                && ctx.query().ciaddr != ctx.your_addr();
            if wants_probe && self.prober.probe(ctx.your_addr()).await {
                warn!(addr = %ctx.your_addr(), "allocated address is already in use");
                self.decline_conflict(&ctx).await;
                ctx.add_retry();
                continue;
            }

            self.allocate_subnet(ctx).await;
            return;
        }
    }

    /// Tell the master the address is taken, through a synthetic decline.
    async fn decline_conflict(&self, ctx: &ClientContext) {
        let conflict_addr = ctx.your_addr();
        match self
            .subnets
            .select_by_addr(conflict_addr, &ctx.query().classes)
        {
            Some(subnet) => {
                let mut decline = Message::new(MessageType::ConflictIp, DECLINE_CONFLICT_XID);
                decline.ciaddr = conflict_addr;
                let decline_ctx = ClientContext::new(decline, subnet.clone());
                self.allocator.notify(decline_ctx.lease_request()).await;
            }
            None => {
                warn!(addr = %conflict_addr, "no subnet for conflicting address decline");
            }
        }
    }

    /// Resolve a shared-subnet override from the master before assigning.
    async fn allocate_subnet(&self, ctx: ClientContext) {
        match ctx.shared_subnet_id() {
            Some(id) if id != ctx.subnet().id() => match self.subnets.by_id(id) {
                Some(subnet) => {
                    let subnet = subnet.clone();
                    self.assign_lease(ctx, &subnet).await;
                }
                None => {
                    warn!(subnet_id = id, "shared subnet from master not found");
                    self.deny_request(ctx.query()).await;
                }
            },
            _ => {
                let subnet = ctx.subnet().clone();
                self.assign_lease(ctx, &subnet).await;
            }
        }
    }

    async fn assign_lease(&self, ctx: ClientContext, subnet: &Subnet) {
        let response = response::gen_ack_response(ctx.query(), ctx.your_addr(), subnet);
        self.emit(ctx.query(), response).await;
    }

    /// DISCOVER failures are dropped silently, REQUEST failures answered
    /// with NAK.
    async fn fail_allocation(&self, query: &Message) {
        if query.message_type() == Some(MessageType::Request) {
            self.deny_request(query).await;
        }
    }

    async fn deny_request(&self, query: &Message) {
        let response = response::gen_nak_response(query);
        self.emit(query, response).await;
    }

    async fn process_release(&self, query: Message) {
        match self.subnets.select_by_addr(query.ciaddr, &query.classes) {
            Some(subnet) => {
                let ctx = ClientContext::new(query, subnet.clone());
                self.allocator.notify(ctx.lease_request()).await;
            }
            None => {
                warn!(ciaddr = %query.ciaddr, "no subnet for release");
                self.stats.count_dropped_no_subnet();
            }
        }
    }

    async fn process_decline(&self, query: Message) {
        let Some(requested) = query
            .get_option(DHO_DHCP_REQUESTED_ADDRESS)
            .and_then(|o| o.as_ipv4())
        else {
            error!(label = %query.label(), "decline without a requested address");
            return;
        };

        match self.subnets.select_by_addr(requested, &query.classes) {
            Some(subnet) => {
                let ctx = ClientContext::new(query, subnet.clone());
                self.allocator.notify(ctx.lease_request()).await;
            }
            None => {
                warn!(addr = %requested, "no subnet for decline");
                self.stats.count_dropped_no_subnet();
            }
        }
    }

    async fn process_inform(&self, query: Message) {
        if query.get_option(DHO_DHCP_SERVER_IDENTIFIER).is_some() {
            warn!(label = %query.label(), "server-id option not expected in DHCPINFORM");
            self.stats.count_dropped_not_accepted();
            return;
        }

        match self.subnets.select_by_addr(query.ciaddr, &query.classes) {
            Some(subnet) => {
                let response =
                    response::gen_ack_response(&query, Ipv4Addr::UNSPECIFIED, subnet);
                self.emit(&query, response).await;
            }
            None => {
                warn!(ciaddr = %query.ciaddr, "no subnet for inform");
                self.stats.count_dropped_no_subnet();
                self.deny_request(&query).await;
            }
        }
    }

    /// Pack, run the send callouts, and queue on egress.
    async fn emit(&self, query: &Message, mut response: Message) {
        let data = match response.pack() {
            Ok(data) => data,
            Err(error) => {
                error!(%error, "unable to pack response");
                return;
            }
        };

        if self.hooks.callouts_present(HOOK_PKT4_SEND) {
            let mut query = query.clone();
            let mut handle = CalloutHandle::new()
                .with_query4(&mut query)
                .with_response4(&mut response);
            self.hooks.call_callouts(HOOK_PKT4_SEND, &mut handle);
            if handle.status() == CalloutStatus::Skip {
                debug!("pkt4_send callout suppressed the response");
                return;
            }
        }

        self.stats.count_send(response.message_type());
        info!(%response, "response");

        let packet = OutPacket {
            data,
            dest: SocketAddrV4::new(response.remote_addr, response.remote_port),
            iface: response.iface.clone(),
        };
        if self.egress.send(Some(packet)).await.is_err() {
            warn!("egress queue closed, dropping response");
        }
    }

    /// The pre-classification acceptance checks: a handled message type,
    /// the INFORM reachability rule, and a server-id that is ours.
    fn accept(&self, query: &Message) -> bool {
        if !self.accept_message_type(query) {
            warn!(label = %query.label(), "unhandled message type");
            return false;
        }
        if !self.accept_direct_request(query) {
            warn!(label = %query.label(), "inform query with zero ciaddr and remote address");
            return false;
        }
        if !self.accept_server_id(query) {
            debug!(label = %query.label(), "query addressed to another server");
            return false;
        }
        true
    }

    fn accept_message_type(&self, query: &Message) -> bool {
        matches!(
            query.message_type(),
            Some(MessageType::Discover)
                | Some(MessageType::Request)
                | Some(MessageType::Release)
                | Some(MessageType::Decline)
                | Some(MessageType::Inform)
        )
    }

    fn accept_direct_request(&self, query: &Message) -> bool {
        if query.is_relayed() {
            return true;
        }
        !(query.message_type() == Some(MessageType::Inform)
            && query.remote_addr.is_unspecified()
            && query.ciaddr.is_unspecified())
    }

    fn accept_server_id(&self, query: &Message) -> bool {
        let Some(option) = query.get_option(DHO_DHCP_SERVER_IDENTIFIER) else {
            return true;
        };
        let Some(server_id) = option.as_ipv4() else {
            return false;
        };
        self.server_ids.contains(&server_id)
    }

    /// Assemble the selector inputs and pick a subnet. The subnet-select
    /// address comes from the RAI link-selection sub-option when relayed,
    /// from the subnet-selection option otherwise.
    fn select_subnet(&self, query: &Message, iface_addr: Ipv4Addr) -> Option<&Subnet> {
        let mut selector = SubnetSelector {
            ciaddr: query.ciaddr,
            giaddr: query.giaddr,
            local_addr: query.local_addr,
            remote_addr: query.remote_addr,
            iface_name: query.iface.clone(),
            iface_addr: Some(iface_addr),
            option_select: Ipv4Addr::UNSPECIFIED,
            client_classes: query.classes.clone(),
        };

        if let Some(rai) = query.get_option(DHO_DHCP_AGENT_OPTIONS) {
            if let Some(link_select) = rai
                .get_sub_option(RAI_OPTION_LINK_SELECTION)
                .and_then(|o| o.as_ipv4())
            {
                selector.option_select = link_select;
            }
        } else if let Some(subnet_select) = query
            .get_option(DHO_SUBNET_SELECTION)
            .and_then(|o| o.as_ipv4())
        {
            selector.option_select = subnet_select;
        }

        self.subnets.select(&selector)
    }
}
