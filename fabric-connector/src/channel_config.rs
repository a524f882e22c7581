// Copyright (c) 2024 The Smartlog Connector Authors
//
// SPDX-License-Identifier: Apache-2.0
//

//! Structural edits of a decoded channel configuration (`common.Config` as
//! JSON). The document is not validated, only the paths below are assumed
//! to exist:
//!
//! - organisations: `channel_group.groups.Application.groups.<msp>`
//! - admin policy: `channel_group.groups.Application.policies.Admins`

use log::{debug, info};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const APPLICATION_GROUPS: &[&str] = &["channel_group", "groups", "Application", "groups"];
const APPLICATION_POLICIES: &[&str] = &["channel_group", "groups", "Application", "policies"];

pub const ADMINS_POLICY: &str = "Admins";

/// Placeholder in the admin policy template replaced by the admin MSP id.
pub const ADMIN_ORG_PLACEHOLDER: &str = "{AdminOrgMSP}";

pub fn parse(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|source| Error::Serialization {
        context: "channel configuration",
        source,
    })
}

fn object_at<'a>(document: &'a mut Value, path: &[&str]) -> Result<&'a mut Map<String, Value>> {
    let mut current = document;
    for (depth, key) in path.iter().enumerate() {
        current = current.get_mut(*key).ok_or_else(|| Error::ConfigEdit {
            path: path[..=depth].join("."),
        })?;
    }

    current.as_object_mut().ok_or_else(|| Error::ConfigEdit {
        path: path.join("."),
    })
}

/// Insert `organisation` as the group of `msp_id`, replacing an existing one.
pub fn add_organisation(config: &mut Value, msp_id: &str, organisation: Value) -> Result<()> {
    info!("Adding organisation {msp_id} to channel configuration");
    object_at(config, APPLICATION_GROUPS)?.insert(msp_id.to_string(), organisation);
    Ok(())
}

/// Remove the group of `msp_id`. Removing an absent organisation leaves the
/// document unchanged and returns `false`.
pub fn remove_organisation(config: &mut Value, msp_id: &str) -> Result<bool> {
    let removed = object_at(config, APPLICATION_GROUPS)?
        .shift_remove(msp_id)
        .is_some();
    if removed {
        info!("Removed organisation {msp_id} from channel configuration");
    } else {
        debug!("Organisation {msp_id} not in channel configuration");
    }
    Ok(removed)
}

/// Replace the application `Admins` policy with `policy_template`, where
/// [`ADMIN_ORG_PLACEHOLDER`] is substituted with `admin_msp`. Used when a
/// channel is first created so only the admin organisation may add members.
pub fn change_admin_policy(config: &mut Value, policy_template: &str, admin_msp: &str) -> Result<()> {
    info!("Changing application admin policy to {admin_msp} only");
    let policy = parse(&policy_template.replace(ADMIN_ORG_PLACEHOLDER, admin_msp))?;
    object_at(config, APPLICATION_POLICIES)?.insert(ADMINS_POLICY.to_string(), policy);
    Ok(())
}
