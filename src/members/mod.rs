//! Follow graph and member directory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Profile, Uid, MEMBERS_PER_PAGE};
use crate::store::{AttrMap, EdgeKind, GraphStore, Node, StoreError, UserNode};

pub struct MemberService {
    store: Arc<dyn GraphStore>,
}

impl MemberService {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Create a follow edge from `follower` to `followee` and queue a
    /// notification for the followee.
    ///
    /// No check for a pre-existing edge is made; calling twice yields two
    /// parallel edges, and `unfollow` then refuses the ambiguous state.
    pub fn follow(&self, follower: &Uid, followee: &str) -> Result<()> {
        let followee = Uid::parse(followee)?;
        if followee == *follower {
            return Err(Error::SelfReference(
                "Follower and followee can't be the same".to_string(),
            ));
        }
        self.user(follower, "Follower")?;
        self.user(&followee, "Followee")?;
        let edge = self
            .store
            .create_edge(EdgeKind::Follow, follower, &followee, AttrMap::new())?;
        self.store.enqueue_notification(&followee, &edge.id, "follow")?;
        Ok(())
    }

    /// Destroy the follow edge from `follower` to `followee`.
    ///
    /// Requires exactly one such edge; zero or several are both reported as
    /// not found rather than auto-resolved.
    pub fn unfollow(&self, follower: &Uid, followee: &str) -> Result<()> {
        let followee = Uid::parse(followee)?;
        if followee == *follower {
            return Err(Error::SelfReference(
                "Follower and followee can't be the same".to_string(),
            ));
        }
        self.user(follower, "Follower")?;
        self.user(&followee, "Followee")?;
        let edges = self
            .store
            .edges_from_to(follower, &followee, EdgeKind::Follow)?;
        if edges.len() != 1 {
            return Err(Error::NotFound("No follow edge found".to_string()));
        }
        self.store.destroy_edge(&edges[0].id)?;
        Ok(())
    }

    /// Members following `id`, keyed by their identifier.
    pub fn followers(&self, id: &str) -> Result<HashMap<String, Profile>> {
        let id = Uid::parse(id)?;
        let edges = self.store.edges_in(&id, EdgeKind::Follow)?;
        self.peer_profiles(&id, edges.iter().map(|e| &e.tail))
    }

    /// Members `id` follows, keyed by their identifier.
    pub fn following(&self, id: &str) -> Result<HashMap<String, Profile>> {
        let id = Uid::parse(id)?;
        let edges = self.store.edges_out(&id, EdgeKind::Follow)?;
        self.peer_profiles(&id, edges.iter().map(|e| &e.head))
    }

    /// One directory page of all members, keyed by identifier. The founder
    /// counts as an editor even without the flag.
    pub fn list_members(&self, page: usize) -> Result<HashMap<String, Profile>> {
        let founder = self.store.founder()?;
        let members = self.store.members()?;
        let mut out = HashMap::new();
        for node in members
            .into_iter()
            .skip(page * MEMBERS_PER_PAGE)
            .take(MEMBERS_PER_PAGE)
        {
            if let Node::User(user) = node {
                let mut profile = user.profile();
                profile.is_editor = profile.is_editor || user.id == founder;
                out.insert(user.id.to_string(), profile);
            }
        }
        Ok(out)
    }

    fn peer_profiles<'a>(
        &self,
        of: &Uid,
        peers: impl Iterator<Item = &'a Uid>,
    ) -> Result<HashMap<String, Profile>> {
        let mut out = HashMap::new();
        for peer in peers {
            match self.store.node(peer) {
                Ok(Node::User(user)) => {
                    out.insert(user.id.to_string(), user.profile());
                }
                Ok(Node::Other { .. }) => {}
                Err(StoreError::NotFound(_)) => {
                    log::warn!("follow peer {} of {} no longer resolves", peer, of);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    fn user(&self, id: &Uid, role: &str) -> Result<UserNode> {
        match self.store.node(id) {
            Ok(Node::User(user)) => Ok(user),
            Ok(Node::Other { .. }) => Err(Error::NotFound(format!("{} not a User", role))),
            Err(StoreError::NotFound(_)) => Err(Error::NotFound(format!("{} not found", role))),
            Err(e) => Err(e.into()),
        }
    }
}
