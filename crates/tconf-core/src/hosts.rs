//! Per-host views of a cluster configuration.

use crate::params;
use crate::prompt::{DEFAULTS_ALIAS, MemberMap};
use crate::properties::{Node, PropertyStore};

/// Settings copied from a `hosts` member to the top level of its view.
const HOST_SETTINGS: [(&str, &str); 4] = [
    (params::HOST, params::HOST_NAME),
    (params::USERID, params::USERID),
    (params::HOME_DIRECTORY, params::HOME_DIRECTORY),
    (params::TEMP_DIRECTORY, params::TEMP_DIRECTORY),
];

/// Build one configuration per deployment host.
///
/// Each view is the full store with `deployment_host` set to the member
/// alias, the member's settings copied to the top-level host keys, and
/// other hosts' entries pruned. A store without `hosts` members is treated
/// as a single-host configuration.
pub fn host_configurations(store: &PropertyStore) -> Vec<PropertyStore> {
    let members = MemberMap::load(store, params::HOSTS);
    if members.is_empty() {
        return vec![store.clone()];
    }

    members
        .aliases()
        .map(|alias| {
            let alias = alias.as_str();
            let mut view = store.clone();
            view.set(params::DEPLOYMENT_HOST, Some(alias));
            for (member_key, top_key) in HOST_SETTINGS {
                let value = members
                    .value(alias, member_key)
                    .map(str::to_string)
                    .or_else(|| store.get(top_key).map(str::to_string));
                view.set(top_key, value.as_deref());
            }
            if view.get(params::HOST_NAME).is_none() {
                view.set(params::HOST_NAME, Some(alias));
            }

            view.retain_children(params::HOSTS, |key, _| key == alias || key == DEFAULTS_ALIAS);
            view.retain_children(params::REPL_SERVICES, |_, node| match node {
                Node::Map(service) => service
                    .get(params::DEPLOYMENT_HOST)
                    .is_none_or(|host| matches!(host, Node::Value(h) if h == alias)),
                Node::Value(_) => true,
            });
            view
        })
        .collect()
}
