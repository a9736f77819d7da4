//! Category chain coordinator.
//!
//! Categories form a single linked chain through `next_category_id`, and
//! each category owns the ordered list of its channels. Every mutation here
//! reads the affected documents under a lock, validates the whole change
//! and only then commits it as one [`ChangeSet`].
//!
//! Lock order is fixed: the chain lock (operations that rewrite
//! `next_category_id`), then the channel lock (placement), then per-category
//! locks in ascending id order. A category document is only ever written by
//! a holder of its lock, and always from a copy read after that lock was
//! taken. Pointer edits are planned on a snapshot taken under the chain
//! lock, which no other writer of pointers can invalidate.
//!
//! Predecessor lookup is a linear scan over the live categories, which is
//! fine for the handful of categories a community has. A store-side index
//! on `next_category_id` would be needed for much larger chains.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};

use crate::domain::{Category, ChangeSet, Channel, CompositeId, EntityKind, Store};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Result of placing a channel in a category.
#[derive(Debug, Clone)]
pub struct ChannelPlacement {
    pub category: Category,
    pub channel: Channel,
    /// Category the channel was moved out of, when it changed
    pub previous_category: Option<Category>,
}

/// Result of deleting a category.
#[derive(Debug, Clone)]
pub struct CategoryRemoval {
    pub category: Category,
    /// Category whose pointer was spliced past the removed one
    pub predecessor: Option<Category>,
    /// Channels that lost their category
    pub orphaned_channels: Vec<Channel>,
}

pub struct ChainCoordinator {
    store: Store,
    ids: Arc<SnowflakeGenerator>,
    chain_lock: Mutex<()>,
    channel_locks: DashMap<i64, Arc<Mutex<()>>>,
    category_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ChainCoordinator {
    pub fn new(store: Store, ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            store,
            ids,
            chain_lock: Mutex::new(()),
            channel_locks: DashMap::new(),
            category_locks: DashMap::new(),
        }
    }

    /// Live categories in chain order, starting from the head.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let _chain = self.chain_lock.lock().await;
        let live = self.store.categories.find_live().await?;
        Ok(chain_order(live))
    }

    /// Create a category after `prev_id`, or at the tail of the chain.
    #[instrument(skip(self, description), level = "debug")]
    pub async fn create_category(
        &self,
        name: String,
        description: Option<String>,
        prev_id: Option<i64>,
    ) -> Result<Category, AppError> {
        let _chain = self.chain_lock.lock().await;
        let nodes = self.live_nodes().await?;

        let anchor = match prev_id {
            Some(prev_id) => Some(
                nodes
                    .get(&prev_id)
                    .map(|c| c.id)
                    .ok_or_else(|| AppError::not_found("Previous category"))?,
            ),
            None => tail_of(&nodes),
        };

        let _guards = self.lock_categories(anchor.as_slice()).await;
        let mut category = Category::new(self.ids.generate(), name, description);
        let mut changes = ChangeSet::new();

        if let Some(anchor_id) = anchor {
            let mut anchor = self.live_category(anchor_id).await?;
            category.next_category_id = anchor.next_category_id;
            anchor.next_category_id = Some(category.id);
            anchor.touch();
            changes.category(anchor);
        }
        changes.category(category.clone());

        self.store.unit_of_work.commit(changes).await?;
        info!(category_id = category.id, after = ?anchor, "Category created");
        Ok(category)
    }

    /// Rename or re-describe a category. Chain pointers are left alone.
    pub async fn update_category(
        &self,
        id: i64,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Category, AppError> {
        let _guards = self.lock_categories(&[id]).await;
        let mut category = self.live_category(id).await?;

        if let Some(name) = name {
            category.name = name;
        }
        if let Some(description) = description {
            category.description = Some(description);
        }
        category.touch();

        self.store.categories.save(&category).await
    }

    /// Move `target_id` to sit right after `new_prev_id`, or to the head of
    /// the chain when `new_prev_id` is `None`.
    ///
    /// Relocating a category to the position it already holds changes
    /// nothing.
    #[instrument(skip(self), level = "debug")]
    pub async fn relocate(
        &self,
        target_id: i64,
        new_prev_id: Option<i64>,
    ) -> Result<Category, AppError> {
        let _chain = self.chain_lock.lock().await;
        let mut nodes = self.live_nodes().await?;

        if !nodes.contains_key(&target_id) {
            return Err(AppError::not_found("Category"));
        }
        if let Some(prev_id) = new_prev_id {
            if prev_id == target_id {
                return Err(AppError::InvariantViolation(
                    "A category cannot be placed after itself".into(),
                ));
            }
            if !nodes.contains_key(&prev_id) {
                return Err(AppError::not_found("Previous category"));
            }
        }

        let before = pointers(&nodes);
        splice(&mut nodes, target_id, new_prev_id);
        check_splice(&nodes, target_id)?;

        let repointed: HashMap<i64, Option<i64>> = pointers(&nodes)
            .into_iter()
            .filter(|(id, next)| before.get(id) != Some(next))
            .collect();
        let locked: Vec<i64> = repointed.keys().copied().chain([target_id]).collect();
        let _guards = self.lock_categories(&locked).await;

        if repointed.is_empty() {
            debug!(category_id = target_id, "Relocation left the chain unchanged");
            return self.live_category(target_id).await;
        }

        let mut changes = ChangeSet::new();
        for (id, next) in &repointed {
            let mut fresh = self.live_category(*id).await?;
            fresh.next_category_id = *next;
            fresh.touch();
            changes.category(fresh);
        }
        let target = match changes.categories.iter().find(|c| c.id == target_id) {
            Some(target) => target.clone(),
            None => self.live_category(target_id).await?,
        };

        self.store.unit_of_work.commit(changes).await?;
        info!(category_id = target_id, after = ?new_prev_id, "Category relocated");
        Ok(target)
    }

    /// Soft-delete a category, splice it out of the chain and detach its
    /// channels.
    #[instrument(skip(self), level = "debug")]
    pub async fn remove_category(&self, id: i64) -> Result<CategoryRemoval, AppError> {
        let _chain = self.chain_lock.lock().await;
        let nodes = self.live_nodes().await?;
        if !nodes.contains_key(&id) {
            return Err(AppError::not_found("Category"));
        }

        let predecessor_id = predecessor_of(&nodes, id);
        let locked: Vec<i64> = predecessor_id.into_iter().chain([id]).collect();
        let _guards = self.lock_categories(&locked).await;

        let mut category = self.live_category(id).await?;
        let mut changes = ChangeSet::new();

        let predecessor = match predecessor_id {
            Some(pred_id) => {
                let mut pred = self.live_category(pred_id).await?;
                pred.next_category_id = category.next_category_id;
                pred.touch();
                changes.category(pred.clone());
                Some(pred)
            }
            None => None,
        };

        let mut orphaned_channels = Vec::new();
        for channel_id in &category.channels_order {
            if let Some(mut channel) = self.store.channels.find_by_id(*channel_id).await? {
                if channel.is_live() && channel.category_id == Some(id) {
                    channel.set_category(None);
                    changes.channel(channel.clone());
                    orphaned_channels.push(channel);
                }
            }
        }

        category.soft_delete();
        category.next_category_id = None;
        changes.category(category.clone());

        self.store.unit_of_work.commit(changes).await?;
        info!(
            category_id = id,
            orphaned = orphaned_channels.len(),
            "Category removed"
        );
        Ok(CategoryRemoval {
            category,
            predecessor,
            orphaned_channels,
        })
    }

    /// Place a channel at the end of a category, moving it out of its
    /// previous category if it had one. Placing a channel where it already
    /// is changes nothing.
    #[instrument(skip(self), level = "debug")]
    pub async fn add_channel(
        &self,
        category_id: i64,
        channel_id: i64,
    ) -> Result<ChannelPlacement, AppError> {
        let _placement = self.lock_channel(channel_id).await;

        // Only placement (serialized above) moves a channel into a category;
        // removal may still clear it, which needs no extra lock.
        let snapshot = self.live_channel(channel_id).await?;
        let mut locked = vec![category_id];
        locked.extend(snapshot.category_id);
        let _guards = self.lock_categories(&locked).await;

        let mut channel = self.live_channel(channel_id).await?;
        let mut category = self.live_category(category_id).await?;

        if channel.category_id == Some(category_id) && category.contains_channel(channel_id) {
            return Ok(ChannelPlacement {
                category,
                channel,
                previous_category: None,
            });
        }

        let mut changes = ChangeSet::new();
        let mut previous_category = None;
        if let Some(old_id) = channel.category_id.filter(|old| *old != category_id) {
            if let Some(mut old) = self.store.categories.find_by_id(old_id).await? {
                if old.remove_channel(channel_id) {
                    old.touch();
                    changes.category(old.clone());
                    previous_category = Some(old);
                }
            }
        }

        category.append_channel(channel_id);
        category.touch();
        channel.set_category(Some(category_id));
        changes.category(category.clone()).channel(channel.clone());

        self.store.unit_of_work.commit(changes).await?;
        info!(category_id, channel_id, "Channel placed in category");
        Ok(ChannelPlacement {
            category,
            channel,
            previous_category,
        })
    }

    /// Store a brand-new channel already placed at the end of `category_id`,
    /// in the same commit as the category's updated order.
    #[instrument(skip(self, channel), fields(channel_id = channel.id), level = "debug")]
    pub async fn insert_channel_into(
        &self,
        category_id: i64,
        mut channel: Channel,
    ) -> Result<ChannelPlacement, AppError> {
        let _guards = self.lock_categories(&[category_id]).await;
        let mut category = self.live_category(category_id).await?;

        category.append_channel(channel.id);
        category.touch();
        channel.set_category(Some(category_id));

        let mut changes = ChangeSet::new();
        changes.category(category.clone()).channel(channel.clone());
        self.store.unit_of_work.commit(changes).await?;
        info!(category_id, channel_id = channel.id, "Channel created in category");
        Ok(ChannelPlacement {
            category,
            channel,
            previous_category: None,
        })
    }

    /// Replace a category's channel order wholesale.
    ///
    /// `ordered` must list every current member exactly once.
    #[instrument(skip(self, ordered), level = "debug")]
    pub async fn reorder_channels(
        &self,
        category_id: i64,
        ordered: Vec<i64>,
    ) -> Result<Category, AppError> {
        let _guards = self.lock_categories(&[category_id]).await;
        let mut category = self.live_category(category_id).await?;

        let mut seen = HashSet::with_capacity(ordered.len());
        for id in &ordered {
            if !seen.insert(*id) {
                return Err(AppError::InvariantViolation(format!(
                    "Duplicate channel {} in order",
                    CompositeId::format(EntityKind::Channel, *id)
                )));
            }
        }

        let mut members = HashSet::with_capacity(category.channels_order.len());
        for id in &category.channels_order {
            if let Some(channel) = self.store.channels.find_by_id(*id).await? {
                if channel.is_live() && channel.category_id == Some(category_id) {
                    members.insert(*id);
                }
            }
        }

        if let Some(stranger) = ordered.iter().find(|id| !members.contains(id)) {
            return Err(AppError::InvariantViolation(format!(
                "Channel {} is not a member of this category",
                CompositeId::format(EntityKind::Channel, *stranger)
            )));
        }
        if seen.len() != members.len() {
            return Err(AppError::InvariantViolation(
                "Order must list every channel of the category".into(),
            ));
        }

        category.channels_order = ordered;
        category.touch();

        let mut changes = ChangeSet::new();
        changes.category(category.clone());
        self.store.unit_of_work.commit(changes).await?;
        Ok(category)
    }

    async fn live_nodes(&self) -> Result<HashMap<i64, Category>, AppError> {
        Ok(self
            .store
            .categories
            .find_live()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }

    async fn live_category(&self, id: i64) -> Result<Category, AppError> {
        match self.store.categories.find_by_id(id).await? {
            Some(category) if !category.is_deleted => Ok(category),
            _ => Err(AppError::not_found("Category")),
        }
    }

    async fn live_channel(&self, id: i64) -> Result<Channel, AppError> {
        match self.store.channels.find_by_id(id).await? {
            Some(channel) if channel.is_live() => Ok(channel),
            _ => Err(AppError::not_found("Channel")),
        }
    }

    async fn lock_channel(&self, id: i64) -> OwnedMutexGuard<()> {
        let lock = self.channel_locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    async fn lock_categories(&self, ids: &[i64]) -> Vec<OwnedMutexGuard<()>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            let lock = self.category_locks.entry(id).or_default().clone();
            guards.push(lock.lock_owned().await);
        }
        guards
    }
}

fn pointers(nodes: &HashMap<i64, Category>) -> HashMap<i64, Option<i64>> {
    nodes
        .iter()
        .map(|(id, c)| (*id, c.next_category_id))
        .collect()
}

/// First live category (by id) pointing at `target`.
fn predecessor_of(nodes: &HashMap<i64, Category>, target: i64) -> Option<i64> {
    nodes
        .values()
        .filter(|c| c.id != target && c.next_category_id == Some(target))
        .map(|c| c.id)
        .min()
}

/// Detach `target` from its predecessor, then link it after `new_prev`, or
/// in front of the remaining chain's head.
fn splice(nodes: &mut HashMap<i64, Category>, target: i64, new_prev: Option<i64>) {
    let target_next = nodes.get(&target).and_then(|c| c.next_category_id);

    if let Some(pred) = predecessor_of(nodes, target) {
        if let Some(pred) = nodes.get_mut(&pred) {
            pred.next_category_id = target_next;
        }
    }

    let new_next = match new_prev {
        Some(prev_id) => {
            let after = nodes.get(&prev_id).and_then(|c| c.next_category_id);
            if let Some(prev) = nodes.get_mut(&prev_id) {
                prev.next_category_id = Some(target);
            }
            after
        }
        None => head_excluding(nodes, target, target_next),
    };

    if let Some(node) = nodes.get_mut(&target) {
        node.next_category_id = new_next;
    }
}

/// Head of the chain formed by every category except `target`.
///
/// `preferred` wins when it is a head, which keeps move-to-head of the
/// current head a no-op.
fn head_excluding(
    nodes: &HashMap<i64, Category>,
    target: i64,
    preferred: Option<i64>,
) -> Option<i64> {
    let referenced: HashSet<i64> = nodes
        .values()
        .filter(|c| c.id != target)
        .filter_map(|c| c.next_category_id)
        .collect();
    let mut heads: Vec<&Category> = nodes
        .values()
        .filter(|c| c.id != target && !referenced.contains(&c.id))
        .collect();

    if let Some(preferred) = preferred {
        if heads.iter().any(|c| c.id == preferred) {
            return Some(preferred);
        }
    }
    heads.sort_by_key(|c| (c.created_at, c.id));
    heads.first().map(|c| c.id)
}

/// Reject a splice that left `target` with more than one predecessor or on
/// a cycle.
fn check_splice(nodes: &HashMap<i64, Category>, target: i64) -> Result<(), AppError> {
    let predecessors = nodes
        .values()
        .filter(|c| c.next_category_id == Some(target))
        .count();
    if predecessors > 1 {
        return Err(AppError::InvariantViolation(
            "Relocation would give a category two predecessors".into(),
        ));
    }

    let mut visited = HashSet::new();
    let mut cursor = Some(target);
    while let Some(id) = cursor {
        if !visited.insert(id) {
            return Err(AppError::InvariantViolation(
                "Relocation would create a cycle in the category chain".into(),
            ));
        }
        cursor = nodes.get(&id).and_then(|c| c.next_category_id);
    }
    Ok(())
}

/// Last category of the chain, the one a new category is appended after.
fn tail_of(nodes: &HashMap<i64, Category>) -> Option<i64> {
    let ordered = chain_order(nodes.values().cloned().collect());
    ordered
        .iter()
        .rev()
        .find(|c| {
            c.next_category_id
                .map_or(true, |next| !nodes.contains_key(&next))
        })
        .map(|c| c.id)
}

/// Order live categories by walking the chain from its head.
///
/// Well-formed data has exactly one head. Disconnected segments follow in
/// creation order, and anything only reachable through a cycle comes last.
pub fn chain_order(categories: Vec<Category>) -> Vec<Category> {
    let mut by_id: HashMap<i64, Category> = categories.into_iter().map(|c| (c.id, c)).collect();

    let referenced: HashSet<i64> = by_id
        .values()
        .filter(|c| c.next_category_id != Some(c.id))
        .filter_map(|c| c.next_category_id)
        .collect();
    let mut starts: Vec<(chrono::DateTime<chrono::Utc>, i64)> = by_id
        .values()
        .filter(|c| !referenced.contains(&c.id))
        .map(|c| (c.created_at, c.id))
        .collect();
    starts.sort();

    let mut leftovers: Vec<i64> = by_id.keys().copied().collect();
    leftovers.sort_unstable();

    let mut ordered = Vec::with_capacity(by_id.len());
    let start_ids = starts
        .into_iter()
        .map(|(_, id)| id)
        .chain(leftovers);
    for start in start_ids {
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            match by_id.remove(&id) {
                Some(category) => {
                    cursor = category.next_category_id;
                    ordered.push(category);
                }
                None => break,
            }
        }
    }
    ordered
}
