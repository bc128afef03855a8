//! SLIP-39 share sets: two-level split, share tree and recovery
//!
//! Splitting encrypts the master secret with the passphrase, splits the
//! result across groups, splits each group secret across its members and
//! encodes every leaf as a mnemonic. The shares form a tree: the root's
//! children are groups, a group's children are member leaves.
//!
//! Combining is the reverse: decode the mnemonics, check that they all
//! belong to one share set, recover each group secret, recover the
//! encrypted master secret across groups and decrypt it.

use crate::cipher;
use crate::shamir::{recover_secret, split_secret, Share, MAX_SHARE_COUNT};
use crate::share::Slip39Share;
use crate::ShamirError;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use zeroize::Zeroize;

/// Smallest allowed master secret: 128 bits.
pub const MIN_SECRET_LENGTH_BYTES: usize = 16;

/// One group in a SLIP-39 configuration: recover the group secret from
/// any `member_threshold` of `member_count` member shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Member shares needed to recover this group's secret.
    pub member_threshold: u8,
    /// Member shares to generate for this group.
    pub member_count: u8,
    /// Human-readable label carried into the share tree.
    pub description: Option<String>,
}

impl GroupSpec {
    pub fn new(member_threshold: u8, member_count: u8) -> Self {
        Self {
            member_threshold,
            member_count,
            description: None,
        }
    }

    pub fn with_description(member_threshold: u8, member_count: u8, description: &str) -> Self {
        Self {
            member_threshold,
            member_count,
            description: Some(description.to_string()),
        }
    }
}

/// Configuration for generating a SLIP-39 share set.
#[derive(Debug, Clone)]
pub struct Slip39Config {
    /// Fixed 15-bit identifier; `None` draws a random one.
    pub identifier: Option<u16>,
    /// Passphrase encrypting the master secret; empty means none.
    pub passphrase: String,
    /// Number of groups required to recover the secret.
    pub group_threshold: u8,
    /// The groups to split into.
    pub groups: Vec<GroupSpec>,
    /// PBKDF2 work factor exponent: `10000 << exponent` total iterations.
    pub iteration_exponent: u8,
    /// Extendable backup flag (empty KDF salt, distinct checksum family).
    pub extendable: bool,
    /// Label for the root of the share tree.
    pub description: String,
}

impl Default for Slip39Config {
    fn default() -> Self {
        Self {
            identifier: None,
            passphrase: String::new(),
            group_threshold: 1,
            groups: vec![GroupSpec::new(2, 3)],
            iteration_exponent: 1,
            extendable: true,
            description: "SLIP-39 shares".to_string(),
        }
    }
}

impl Slip39Config {
    /// Single group, any 2 of 3 shares recover.
    pub fn two_of_three() -> Self {
        Self::default()
    }

    /// Single group, any 3 of 5 shares recover.
    pub fn three_of_five() -> Self {
        Self {
            groups: vec![GroupSpec::new(3, 5)],
            ..Default::default()
        }
    }

    /// Multi-group setup: recover with `group_threshold` complete groups.
    pub fn with_groups(group_threshold: u8, groups: Vec<GroupSpec>) -> Self {
        Self {
            group_threshold,
            groups,
            ..Default::default()
        }
    }

    /// Validate the group structure and parameters.
    pub fn validate(&self) -> Result<(), ShamirError> {
        let group_count = self.groups.len();
        if group_count == 0 || self.group_threshold == 0 {
            return Err(ShamirError::InvalidThreshold {
                threshold: self.group_threshold,
                share_count: group_count as u8,
            });
        }
        if group_count > MAX_SHARE_COUNT as usize {
            return Err(ShamirError::TooManyShares {
                share_count: group_count as u8,
            });
        }
        if self.group_threshold as usize > group_count {
            return Err(ShamirError::InvalidThreshold {
                threshold: self.group_threshold,
                share_count: group_count as u8,
            });
        }
        for group in &self.groups {
            if group.member_count > MAX_SHARE_COUNT {
                return Err(ShamirError::TooManyShares {
                    share_count: group.member_count,
                });
            }
            if group.member_threshold == 0 || group.member_threshold > group.member_count {
                return Err(ShamirError::InvalidThreshold {
                    threshold: group.member_threshold,
                    share_count: group.member_count,
                });
            }
            if group.member_threshold == 1 && group.member_count > 1 {
                return Err(ShamirError::InvalidConfiguration(
                    "multiple member shares with a member threshold of 1 are not allowed; \
                     use 1-of-1 groups instead"
                        .to_string(),
                ));
            }
        }
        if self.iteration_exponent > cipher::MAX_ITERATION_EXPONENT {
            return Err(ShamirError::InvalidConfiguration(format!(
                "iteration exponent {} exceeds the maximum of {}",
                self.iteration_exponent,
                cipher::MAX_ITERATION_EXPONENT
            )));
        }
        if let Some(identifier) = self.identifier {
            if identifier > 0x7fff {
                return Err(ShamirError::InvalidConfiguration(format!(
                    "identifier {} does not fit in 15 bits",
                    identifier
                )));
            }
        }
        Ok(())
    }
}

/// A node of the share tree. The root's children are groups; a group's
/// children are member leaves carrying the mnemonics. Plain owned tree,
/// no back references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slip39Node {
    /// Share index of this node within its parent split.
    pub index: u8,
    /// Human-readable label.
    pub description: String,
    /// The mnemonic, present on leaves only.
    pub mnemonic: Option<String>,
    /// Child nodes, empty on leaves.
    pub children: Vec<Slip39Node>,
}

impl Slip39Node {
    /// Flatten the subtree into mnemonics, depth first.
    pub fn mnemonics(&self) -> Vec<String> {
        match &self.mnemonic {
            Some(m) if self.children.is_empty() => vec![m.clone()],
            _ => self
                .children
                .iter()
                .flat_map(|child| child.mnemonics())
                .collect(),
        }
    }
}

/// A generated SLIP-39 share set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slip39 {
    pub identifier: u16,
    pub extendable: bool,
    pub iteration_exponent: u8,
    pub group_threshold: u8,
    /// The share tree; leaves hold the mnemonics.
    pub root: Slip39Node,
}

impl Slip39 {
    /// All mnemonics of the set, depth first across groups.
    pub fn mnemonics(&self) -> Vec<String> {
        self.root.mnemonics()
    }
}

/// Split a master secret into a SLIP-39 share set.
///
/// The secret is encrypted with the configured passphrase, split across
/// the groups with the group threshold, and each group secret is split
/// across its members. Leaves of the returned tree carry the mnemonics.
pub fn generate_shares(
    master_secret: &[u8],
    config: &Slip39Config,
) -> Result<Slip39, ShamirError> {
    config.validate()?;
    if master_secret.len() < MIN_SECRET_LENGTH_BYTES || master_secret.len() % 2 != 0 {
        return Err(ShamirError::InvalidSecretLength {
            length: master_secret.len(),
        });
    }

    let identifier = match config.identifier {
        Some(id) => id,
        None => random_identifier(),
    };
    let mut encrypted = cipher::encrypt(
        master_secret,
        &config.passphrase,
        config.iteration_exponent,
        identifier,
        config.extendable,
    )?;

    let group_count = config.groups.len() as u8;
    let mut group_shares = split_secret(config.group_threshold, group_count, &encrypted)?;
    encrypted.zeroize();

    let mut root = Slip39Node {
        index: 0,
        description: config.description.clone(),
        mnemonic: None,
        children: Vec::with_capacity(config.groups.len()),
    };
    for (group_share, spec) in group_shares.iter().zip(&config.groups) {
        let group_description = spec
            .description
            .clone()
            .unwrap_or_else(|| format!("Group {}", group_share.index + 1));
        let mut group_node = Slip39Node {
            index: group_share.index,
            description: group_description.clone(),
            mnemonic: None,
            children: Vec::with_capacity(spec.member_count as usize),
        };
        let member_shares = split_secret(spec.member_threshold, spec.member_count, &group_share.data)?;
        for member in member_shares {
            let share = Slip39Share {
                identifier,
                extendable: config.extendable,
                iteration_exponent: config.iteration_exponent,
                group_index: group_share.index,
                group_threshold: config.group_threshold,
                group_count,
                member_index: member.index,
                member_threshold: spec.member_threshold,
                value: member.data,
            };
            group_node.children.push(Slip39Node {
                index: member.index,
                description: format!("{} share {}", group_description, member.index + 1),
                mnemonic: Some(share.to_mnemonic()),
                children: Vec::new(),
            });
        }
        root.children.push(group_node);
    }
    for share in &mut group_shares {
        share.data.zeroize();
    }

    Ok(Slip39 {
        identifier,
        extendable: config.extendable,
        iteration_exponent: config.iteration_exponent,
        group_threshold: config.group_threshold,
        root,
    })
}

/// Recover the master secret from a set of mnemonics.
///
/// Every used group must supply exactly its member threshold of distinct
/// member shares, and exactly the group threshold of groups must be
/// present. Pass the empty string when no passphrase was set.
pub fn combine_mnemonics<S: AsRef<str>>(
    mnemonics: &[S],
    passphrase: &str,
) -> Result<Vec<u8>, ShamirError> {
    if mnemonics.is_empty() {
        return Err(ShamirError::InsufficientGroups {
            required: 1,
            provided: 0,
        });
    }
    let shares: Vec<Slip39Share> = mnemonics
        .iter()
        .map(|m| Slip39Share::from_mnemonic(m.as_ref()))
        .collect::<Result<_, _>>()?;

    let first = &shares[0];
    for share in &shares[1..] {
        check_header(share, first)?;
    }
    let group_threshold = first.group_threshold;
    let iteration_exponent = first.iteration_exponent;
    let identifier = first.identifier;
    let extendable = first.extendable;

    // Group by group index, deduplicating identical member shares.
    let mut groups: BTreeMap<u8, BTreeMap<u8, Slip39Share>> = BTreeMap::new();
    for share in shares {
        let members = groups.entry(share.group_index).or_default();
        if let Some(existing) = members.get(&share.member_index) {
            if existing.value != share.value {
                return Err(ShamirError::InvalidConfiguration(format!(
                    "conflicting share values for member {} of group {}",
                    share.member_index, share.group_index
                )));
            }
            continue;
        }
        members.insert(share.member_index, share);
    }

    if groups.len() != group_threshold as usize {
        return Err(ShamirError::InsufficientGroups {
            required: group_threshold,
            provided: groups.len() as u8,
        });
    }

    let mut group_shares = Vec::with_capacity(groups.len());
    for (group_index, members) in &groups {
        let sample = members.values().next().expect("group cannot be empty");
        let member_threshold = sample.member_threshold;
        if members
            .values()
            .any(|s| s.member_threshold != member_threshold)
        {
            return Err(ShamirError::InconsistentHeader {
                field: "member threshold",
            });
        }
        if members.len() != member_threshold as usize {
            return Err(ShamirError::InsufficientMemberShares {
                required: member_threshold,
                provided: members.len() as u8,
                prefix: sample.group_prefix(),
            });
        }
        let raw: Vec<Share> = members
            .values()
            .map(|s| Share {
                index: s.member_index,
                data: s.value.clone(),
            })
            .collect();
        group_shares.push(Share {
            index: *group_index,
            data: recover_secret(member_threshold, &raw)?,
        });
    }

    let mut encrypted = recover_secret(group_threshold, &group_shares)?;
    for share in &mut group_shares {
        share.data.zeroize();
    }
    let secret = cipher::decrypt(
        &encrypted,
        passphrase,
        iteration_exponent,
        identifier,
        extendable,
    )?;
    encrypted.zeroize();
    Ok(secret)
}

fn check_header(share: &Slip39Share, reference: &Slip39Share) -> Result<(), ShamirError> {
    let field = if share.identifier != reference.identifier {
        "identifier"
    } else if share.extendable != reference.extendable {
        "extendable backup flag"
    } else if share.iteration_exponent != reference.iteration_exponent {
        "iteration exponent"
    } else if share.group_threshold != reference.group_threshold {
        "group threshold"
    } else if share.group_count != reference.group_count {
        "group count"
    } else {
        return Ok(());
    };
    Err(ShamirError::InconsistentHeader { field })
}

/// Draw a random 15-bit identifier from the thread CSPRNG.
fn random_identifier() -> u16 {
    let mut rng = rand::thread_rng();
    (rng.next_u32() & 0x7fff) as u16
}
