use cosmwasm_std::{from_json, to_json_vec, StdResult, Storage};

use crate::error::ContractError;
use crate::state::{Config, Will};

pub const WILL_PREFIX: &str = "will:";
pub const HEIGHT_INDEX_PREFIX: &str = "will-index-height:";
pub const CREATOR_INDEX_PREFIX: &str = "will-index-creator:";

pub fn will_key(id: &str) -> Vec<u8> {
    format!("{WILL_PREFIX}{id}").into_bytes()
}

pub fn height_index_key(height: u64) -> Vec<u8> {
    format!("{HEIGHT_INDEX_PREFIX}{height}").into_bytes()
}

pub fn creator_index_key(address: &str) -> Vec<u8> {
    format!("{CREATOR_INDEX_PREFIX}{address}").into_bytes()
}

fn read_ids(store: &dyn Storage, key: &[u8]) -> StdResult<Vec<String>> {
    match store.get(key) {
        Some(bytes) => from_json(bytes),
        None => Ok(vec![]),
    }
}

fn load(store: &dyn Storage, id: &str) -> Result<Will, ContractError> {
    let bytes = store
        .get(&will_key(id))
        .ok_or_else(|| ContractError::NotFound { id: id.to_string() })?;
    Ok(from_json(bytes)?)
}

/// Will records plus the height and creator indices, stored under
/// `will:<id>`, `will-index-height:<height>` and `will-index-creator:<address>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WillRepository {
    max_wills_per_height: u32,
}

impl WillRepository {
    pub const fn new(max_wills_per_height: u32) -> Self {
        WillRepository {
            max_wills_per_height,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_wills_per_height)
    }

    pub fn exists(&self, store: &dyn Storage, id: &str) -> bool {
        store.get(&will_key(id)).is_some()
    }

    pub fn get(&self, store: &dyn Storage, id: &str) -> Result<Will, ContractError> {
        load(store, id)
    }

    /// Write the record. The first write of an id also appends it to the
    /// height index (bounded by `max_wills_per_height`) and the creator
    /// index; later writes only replace the record. The capacity check runs
    /// before anything is written.
    pub fn put(&self, store: &mut dyn Storage, will: &Will) -> Result<(), ContractError> {
        let key = will_key(&will.id);
        let record = to_json_vec(will)?;

        if store.get(&key).is_none() {
            let height_key = height_index_key(will.maturity_height);
            let mut at_height = read_ids(store, &height_key)?;
            if at_height.len() >= self.max_wills_per_height as usize {
                return Err(ContractError::LimitExceeded {
                    height: will.maturity_height,
                    limit: self.max_wills_per_height,
                });
            }
            if !at_height.contains(&will.id) {
                at_height.push(will.id.clone());
            }

            let creator_key = creator_index_key(&will.creator);
            let mut by_creator = read_ids(store, &creator_key)?;
            if !by_creator.contains(&will.id) {
                by_creator.push(will.id.clone());
            }

            store.set(&height_key, &to_json_vec(&at_height)?);
            store.set(&creator_key, &to_json_vec(&by_creator)?);
        }

        store.set(&key, &record);
        Ok(())
    }

    /// Ids maturing at `height`, in insertion order.
    pub fn index_by_height(&self, store: &dyn Storage, height: u64) -> StdResult<Vec<String>> {
        read_ids(store, &height_index_key(height))
    }

    pub fn ids_by_creator(&self, store: &dyn Storage, address: &str) -> StdResult<Vec<String>> {
        read_ids(store, &creator_index_key(address))
    }

    /// Lazily resolve every will created by `address`.
    pub fn list_by_creator<'s>(
        &self,
        store: &'s dyn Storage,
        address: &str,
    ) -> StdResult<WillsByCreator<'s>> {
        let ids = self.ids_by_creator(store, address)?;
        Ok(WillsByCreator {
            store,
            ids: ids.into_iter(),
            skipped: 0,
        })
    }
}

/// Skip-and-continue listing: an id whose record is missing or does not
/// decode is counted in [`WillsByCreator::skipped`] and iteration moves on.
pub struct WillsByCreator<'s> {
    store: &'s dyn Storage,
    ids: std::vec::IntoIter<String>,
    skipped: usize,
}

impl WillsByCreator<'_> {
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for WillsByCreator<'_> {
    type Item = Will;

    fn next(&mut self) -> Option<Will> {
        for id in self.ids.by_ref() {
            match load(self.store, &id) {
                Ok(will) => return Some(will),
                Err(_) => self.skipped += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ComponentKind, ComponentStatus, ExecutionComponent, WillStatus};
    use cosmwasm_std::coin;
    use cosmwasm_std::testing::MockStorage;

    fn will(id: &str, creator: &str, height: u64) -> Will {
        Will {
            id: id.to_string(),
            creator: creator.to_string(),
            name: format!("name-{id}"),
            beneficiary: "bob".to_string(),
            maturity_height: height,
            status: WillStatus::Live,
            components: vec![ExecutionComponent {
                id: "pay".to_string(),
                name: "pay bob".to_string(),
                status: ComponentStatus::Pending,
                kind: ComponentKind::Transfer {
                    to: "bob".to_string(),
                    amount: coin(10, "uwill"),
                },
            }],
        }
    }

    #[test]
    fn put_then_get() {
        let mut store = MockStorage::new();
        let repo = WillRepository::new(10);
        let w = will("w1", "alice", 50);
        repo.put(&mut store, &w).unwrap();

        assert_eq!(repo.get(&store, "w1").unwrap(), w);
        assert!(store.get(b"will:w1").is_some());
        assert_eq!(repo.index_by_height(&store, 50).unwrap(), vec!["w1"]);
        assert_eq!(repo.ids_by_creator(&store, "alice").unwrap(), vec!["w1"]);
    }

    #[test]
    fn missing_will_is_not_found() {
        let store = MockStorage::new();
        let err = WillRepository::new(10).get(&store, "nope").unwrap_err();
        assert_eq!(
            err,
            ContractError::NotFound {
                id: "nope".to_string()
            }
        );
    }

    #[test]
    fn re_put_does_not_duplicate_index_entries() {
        let mut store = MockStorage::new();
        let repo = WillRepository::new(10);
        let mut w = will("w1", "alice", 50);
        repo.put(&mut store, &w).unwrap();

        w.status = WillStatus::Expired;
        repo.put(&mut store, &w).unwrap();

        assert_eq!(repo.index_by_height(&store, 50).unwrap(), vec!["w1"]);
        assert_eq!(repo.ids_by_creator(&store, "alice").unwrap(), vec!["w1"]);
        assert_eq!(repo.get(&store, "w1").unwrap().status, WillStatus::Expired);
    }

    #[test]
    fn height_bucket_is_capped_before_writing() {
        let mut store = MockStorage::new();
        let repo = WillRepository::new(2);
        repo.put(&mut store, &will("w1", "alice", 7)).unwrap();
        repo.put(&mut store, &will("w2", "alice", 7)).unwrap();

        let err = repo.put(&mut store, &will("w3", "alice", 7)).unwrap_err();
        assert_eq!(
            err,
            ContractError::LimitExceeded {
                height: 7,
                limit: 2
            }
        );
        assert!(!repo.exists(&store, "w3"));
        assert_eq!(repo.ids_by_creator(&store, "alice").unwrap(), vec!["w1", "w2"]);

        // a different height still has room
        repo.put(&mut store, &will("w3", "alice", 8)).unwrap();
    }

    #[test]
    fn height_index_keeps_insertion_order() {
        let mut store = MockStorage::new();
        let repo = WillRepository::new(10);
        for id in ["c", "a", "b"] {
            repo.put(&mut store, &will(id, "alice", 3)).unwrap();
        }
        assert_eq!(repo.index_by_height(&store, 3).unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn listing_skips_missing_and_corrupt_records() {
        let mut store = MockStorage::new();
        let repo = WillRepository::new(10);
        for id in ["w1", "w2", "w3", "w4"] {
            repo.put(&mut store, &will(id, "alice", 9)).unwrap();
        }
        store.set(b"will:w2", b"not json");
        store.remove(b"will:w4");

        let mut listing = repo.list_by_creator(&store, "alice").unwrap();
        let ids: Vec<String> = listing.by_ref().map(|w| w.id).collect();
        assert_eq!(ids, vec!["w1", "w3"]);
        assert_eq!(listing.skipped(), 2);
    }

    #[test]
    fn listing_unknown_creator_is_empty() {
        let store = MockStorage::new();
        let listing = WillRepository::new(10)
            .list_by_creator(&store, "nobody")
            .unwrap();
        assert_eq!(listing.count(), 0);
    }
}
