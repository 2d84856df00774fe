//! Resolution of the VPC placement a migration task is launched into.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{DeployError, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vpc {
    pub vpc_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnet {
    pub subnet_id: String,
    /// `None` when the provider did not report the attribute.
    pub map_public_ip_on_launch: Option<bool>,
}

impl Subnet {
    /// Only an explicit `false` marks a subnet as private.
    pub fn is_private(&self) -> bool {
        self.map_public_ip_on_launch == Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityGroup {
    pub group_id: String,
    pub group_name: String,
    pub name_tag: Option<String>,
}

impl SecurityGroup {
    fn is_named(&self, name: &str) -> bool {
        self.group_name == name || self.name_tag.as_deref() == Some(name)
    }
}

/// Read-only network queries, in provider order.
pub trait NetworkProvider {
    fn find_vpcs_by_name_tag(&self, name_tag: &str) -> Result<Vec<Vpc>, DeployError>;

    fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, DeployError>;

    fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, DeployError>;
}

/// What to do when a lookup by name matches more than one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupPolicy {
    /// Take the first match in provider order and log a warning.
    #[default]
    FirstMatch,
    /// Fail with [`DeployError::Ambiguous`].
    RequireUnique,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkContext {
    vpc_id: String,
    private_subnet_ids: BTreeSet<String>,
    security_group_id: String,
}

impl NetworkContext {
    pub fn new(
        vpc_id: impl Into<String>,
        private_subnet_ids: impl IntoIterator<Item = String>,
        security_group_id: impl Into<String>,
    ) -> Result<Self, DeployError> {
        let vpc_id = vpc_id.into();
        let private_subnet_ids: BTreeSet<String> = private_subnet_ids.into_iter().collect();
        if private_subnet_ids.is_empty() {
            return Err(DeployError::not_found(
                ResourceKind::PrivateSubnet,
                format!("vpc {vpc_id} has no subnet without automatic public IP assignment"),
            ));
        }

        let security_group_id = security_group_id.into();
        if security_group_id.trim().is_empty() {
            return Err(DeployError::not_found(
                ResourceKind::SecurityGroup,
                format!("vpc {vpc_id} security group id is empty"),
            ));
        }

        Ok(Self {
            vpc_id,
            private_subnet_ids,
            security_group_id,
        })
    }

    pub fn vpc_id(&self) -> &str {
        &self.vpc_id
    }

    pub fn private_subnet_ids(&self) -> &BTreeSet<String> {
        &self.private_subnet_ids
    }

    pub fn security_group_id(&self) -> &str {
        &self.security_group_id
    }
}

pub struct NetworkResolver<'a> {
    provider: &'a dyn NetworkProvider,
    policy: LookupPolicy,
}

impl<'a> NetworkResolver<'a> {
    pub fn new(provider: &'a dyn NetworkProvider, policy: LookupPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn resolve_network(
        &self,
        vpc_tag: &str,
        security_group_name: &str,
    ) -> Result<NetworkContext, DeployError> {
        let vpcs = self.provider.find_vpcs_by_name_tag(vpc_tag)?;
        let vpc = self.select(
            ResourceKind::Vpc,
            vpcs,
            &format!("vpc tagged Name={vpc_tag}"),
            |vpc| vpc.vpc_id.as_str(),
        )?;

        let subnets = self.provider.list_subnets(&vpc.vpc_id)?;
        let private_subnet_ids = private_subnet_ids(&subnets);
        debug!(
            vpc_id = %vpc.vpc_id,
            total_subnets = subnets.len(),
            private_subnets = private_subnet_ids.len(),
            "filtered private subnets"
        );
        if private_subnet_ids.is_empty() {
            return Err(DeployError::not_found(
                ResourceKind::PrivateSubnet,
                format!(
                    "vpc {} has no subnet without automatic public IP assignment",
                    vpc.vpc_id
                ),
            ));
        }

        let groups: Vec<SecurityGroup> = self
            .provider
            .list_security_groups(&vpc.vpc_id)?
            .into_iter()
            .filter(|group| group.is_named(security_group_name))
            .collect();
        let group = self.select(
            ResourceKind::SecurityGroup,
            groups,
            &format!("security group {security_group_name} in vpc {}", vpc.vpc_id),
            |group| group.group_id.as_str(),
        )?;

        let context = NetworkContext::new(vpc.vpc_id, private_subnet_ids, group.group_id)?;
        info!(
            vpc_id = context.vpc_id(),
            subnets = ?context.private_subnet_ids(),
            security_group_id = context.security_group_id(),
            "resolved network context"
        );
        Ok(context)
    }

    fn select<T>(
        &self,
        resource: ResourceKind,
        mut matches: Vec<T>,
        description: &str,
        id_of: impl Fn(&T) -> &str,
    ) -> Result<T, DeployError> {
        match matches.len() {
            0 => Err(DeployError::not_found(
                resource,
                format!("no {description}"),
            )),
            1 => Ok(matches.remove(0)),
            count => {
                let ids: Vec<&str> = matches.iter().map(&id_of).collect();
                match self.policy {
                    LookupPolicy::RequireUnique => Err(DeployError::ambiguous(
                        resource,
                        format!("{count} matches for {description}: {}", ids.join(", ")),
                    )),
                    LookupPolicy::FirstMatch => {
                        warn!(
                            resource = %resource,
                            matches = ?ids,
                            selected = ids[0],
                            "multiple matches for {description}, using the first"
                        );
                        Ok(matches.remove(0))
                    }
                }
            }
        }
    }
}

/// Ids of the subnets that do not assign public IPs on launch.
pub fn private_subnet_ids(subnets: &[Subnet]) -> BTreeSet<String> {
    subnets
        .iter()
        .filter(|subnet| subnet.is_private())
        .map(|subnet| subnet.subnet_id.clone())
        .collect()
}
