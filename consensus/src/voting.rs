//! Voter -> delegate -> weight assignments for DPoS.
//!
//! A standalone ledger of cast votes. Delegate ranking itself is driven
//! by raw stake; this ledger is exposed to callers for delegate
//! popularity queries and future ranking policies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VotingSystem {
    /// voter -> (delegate -> weight)
    votes: HashMap<String, HashMap<String, u64>>,
}

impl VotingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cast a vote for a delegate. A voter's repeated vote for the same
    /// delegate overwrites the previous weight (last write wins).
    pub fn vote(&mut self, voter: &str, delegate: &str, weight: u64) {
        self.votes
            .entry(voter.to_string())
            .or_default()
            .insert(delegate.to_string(), weight);
    }

    /// Remove a voter's vote for a delegate, if present
    pub fn unvote(&mut self, voter: &str, delegate: &str) {
        if let Some(voter_votes) = self.votes.get_mut(voter) {
            voter_votes.remove(delegate);
        }
    }

    /// Total weight across all voters for a delegate
    pub fn get_delegate_votes(&self, delegate: &str) -> u64 {
        self.votes
            .values()
            .filter_map(|voter_votes| voter_votes.get(delegate))
            .sum()
    }

    /// All votes cast by a voter
    pub fn get_voter_votes(&self, voter: &str) -> HashMap<String, u64> {
        self.votes.get(voter).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_accumulates_across_voters() {
        let mut voting = VotingSystem::new();
        voting.vote("alice", "delegate1", 3);
        voting.vote("bob", "delegate1", 2);
        voting.vote("carol", "delegate2", 1);

        assert_eq!(voting.get_delegate_votes("delegate1"), 5);
        assert_eq!(voting.get_delegate_votes("delegate2"), 1);
        assert_eq!(voting.get_delegate_votes("delegate3"), 0);
    }

    #[test]
    fn test_revote_overwrites_weight() {
        let mut voting = VotingSystem::new();
        voting.vote("alice", "delegate1", 3);
        voting.vote("alice", "delegate1", 1);

        assert_eq!(voting.get_delegate_votes("delegate1"), 1);
    }

    #[test]
    fn test_unvote_removes_entry() {
        let mut voting = VotingSystem::new();
        voting.vote("alice", "delegate1", 3);
        voting.vote("alice", "delegate2", 2);
        voting.unvote("alice", "delegate1");

        assert_eq!(voting.get_delegate_votes("delegate1"), 0);
        let remaining = voting.get_voter_votes("alice");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining["delegate2"], 2);

        // Unvoting a missing entry is a no-op
        voting.unvote("alice", "delegate1");
        voting.unvote("nobody", "delegate1");
    }

    #[test]
    fn test_voter_votes_for_unknown_voter_is_empty() {
        let voting = VotingSystem::new();
        assert!(voting.get_voter_votes("ghost").is_empty());
    }
}
