use aws_sdk_ec2::types::{self as sdk, Filter, Tag};
use ecs_deploy_core::error::DeployError;
use ecs_deploy_core::network::{NetworkProvider, SecurityGroup, Subnet, Vpc};
use tracing::debug;

use super::{block_on, dependency_error};

#[derive(Debug, Clone)]
pub struct Ec2NetworkProvider {
    client: aws_sdk_ec2::Client,
}

impl Ec2NetworkProvider {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

impl NetworkProvider for Ec2NetworkProvider {
    fn find_vpcs_by_name_tag(&self, name_tag: &str) -> Result<Vec<Vpc>, DeployError> {
        let mut vpcs = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = block_on(
                self.client
                    .describe_vpcs()
                    .filters(filter("tag:Name", name_tag))
                    .set_next_token(next_token.take())
                    .send(),
            )
            .map_err(|error| dependency_error("ec2:DescribeVpcs", error))?;

            vpcs.extend(output.vpcs().iter().filter_map(vpc_from_sdk));
            match continuation(output.next_token()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(name_tag, matches = vpcs.len(), "described vpcs");
        Ok(vpcs)
    }

    fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, DeployError> {
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = block_on(
                self.client
                    .describe_subnets()
                    .filters(filter("vpc-id", vpc_id))
                    .set_next_token(next_token.take())
                    .send(),
            )
            .map_err(|error| dependency_error("ec2:DescribeSubnets", error))?;

            subnets.extend(output.subnets().iter().filter_map(subnet_from_sdk));
            match continuation(output.next_token()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(subnets)
    }

    fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, DeployError> {
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let output = block_on(
                self.client
                    .describe_security_groups()
                    .filters(filter("vpc-id", vpc_id))
                    .set_next_token(next_token.take())
                    .send(),
            )
            .map_err(|error| dependency_error("ec2:DescribeSecurityGroups", error))?;

            groups.extend(
                output
                    .security_groups()
                    .iter()
                    .filter_map(security_group_from_sdk),
            );
            match continuation(output.next_token()) {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(groups)
    }
}

fn filter(name: &str, value: &str) -> Filter {
    Filter::builder().name(name).values(value).build()
}

fn continuation(token: Option<&str>) -> Option<String> {
    token
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn vpc_from_sdk(vpc: &sdk::Vpc) -> Option<Vpc> {
    vpc.vpc_id().map(|vpc_id| Vpc {
        vpc_id: vpc_id.to_string(),
    })
}

fn subnet_from_sdk(subnet: &sdk::Subnet) -> Option<Subnet> {
    subnet.subnet_id().map(|subnet_id| Subnet {
        subnet_id: subnet_id.to_string(),
        map_public_ip_on_launch: subnet.map_public_ip_on_launch(),
    })
}

fn security_group_from_sdk(group: &sdk::SecurityGroup) -> Option<SecurityGroup> {
    let group_id = group.group_id()?;
    Some(SecurityGroup {
        group_id: group_id.to_string(),
        group_name: group.group_name().unwrap_or_default().to_string(),
        name_tag: name_tag(group.tags()),
    })
}

fn name_tag(tags: &[Tag]) -> Option<String> {
    tags.iter()
        .find(|tag| tag.key() == Some("Name"))
        .and_then(Tag::value)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subnet_keeps_public_ip_attribute() {
        let private = sdk::Subnet::builder()
            .subnet_id("subnet-private")
            .map_public_ip_on_launch(false)
            .build();
        let unknown = sdk::Subnet::builder().subnet_id("subnet-unknown").build();

        let private = subnet_from_sdk(&private).expect("subnet has an id");
        let unknown = subnet_from_sdk(&unknown).expect("subnet has an id");

        assert!(private.is_private());
        assert_eq!(unknown.map_public_ip_on_launch, None);
        assert!(!unknown.is_private());
    }

    #[test]
    fn subnet_without_id_is_dropped() {
        let subnet = sdk::Subnet::builder().map_public_ip_on_launch(false).build();
        assert!(subnet_from_sdk(&subnet).is_none());
    }

    #[test]
    fn security_group_reads_name_tag() {
        let group = sdk::SecurityGroup::builder()
            .group_id("sg-0tasks")
            .group_name("terraform-20240101")
            .tags(Tag::builder().key("Env").value("prod").build())
            .tags(Tag::builder().key("Name").value("acme-sg-ecs-tasks").build())
            .build();

        let group = security_group_from_sdk(&group).expect("group has an id");

        assert_eq!(group.group_id, "sg-0tasks");
        assert_eq!(group.group_name, "terraform-20240101");
        assert_eq!(group.name_tag.as_deref(), Some("acme-sg-ecs-tasks"));
    }

    #[test]
    fn empty_next_token_ends_pagination() {
        assert_eq!(continuation(Some("")), None);
        assert_eq!(continuation(None), None);
        assert_eq!(continuation(Some("abc")), Some("abc".to_string()));
    }

    #[test]
    fn filter_targets_a_single_value() {
        let filter = filter("tag:Name", "acme-vpc");
        assert_eq!(filter.name(), Some("tag:Name"));
        assert_eq!(filter.values(), ["acme-vpc".to_string()]);
    }
}
