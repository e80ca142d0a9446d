//! Contextual bandit arm selection (§4.5), grounded on
//! `original_source/aegislights-controller/adaptation_manager/bandit.py::ContextualBandit`.

use rand::Rng;
use rand_distr::{Beta, Distribution};

use traffic_kb::BanditArm;

/// One candidate plan and its persisted arm statistics.
pub struct Candidate<'a> {
    pub plan_id: &'a str,
    pub arm: BanditArm,
}

/// Upper Confidence Bound: an untried arm always wins; otherwise pick the
/// arm maximising `avg_reward + ε·√(ln T / N)` (§4.5).
pub fn select_ucb<'a>(candidates: &[Candidate<'a>], exploration_factor: f64) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    if let Some(unseen) = candidates.iter().find(|c| c.arm.times_selected == 0) {
        return Some(unseen.plan_id);
    }
    let total_pulls: u64 = candidates.iter().map(|c| c.arm.times_selected).sum();
    candidates
        .iter()
        .max_by(|a, b| ucb_score(a, total_pulls, exploration_factor).partial_cmp(&ucb_score(b, total_pulls, exploration_factor)).unwrap())
        .map(|c| c.plan_id)
}

fn ucb_score(candidate: &Candidate, total_pulls: u64, exploration_factor: f64) -> f64 {
    let n = candidate.arm.times_selected as f64;
    candidate.arm.avg_reward + exploration_factor * ((total_pulls as f64).ln() / n).sqrt()
}

/// Fold one observed `reward` into an arm's running statistics (§3, §4.5
/// "Reward Feedback"). `times_selected`, `total_reward` and `avg_reward`
/// are all monotone non-decreasing in the sense required by §8 property 2
/// (times_selected strictly increases; total_reward and avg_reward follow
/// the running mean, which is not itself required to be monotone).
pub fn update_arm(arm: BanditArm, reward: f64) -> BanditArm {
    let times_selected = arm.times_selected + 1;
    let total_reward = arm.total_reward + reward;
    let avg_reward = total_reward / times_selected as f64;
    let confidence = 1.0 / (times_selected as f64).max(1.0).sqrt();
    BanditArm {
        times_selected,
        total_reward,
        avg_reward,
        confidence,
    }
}

/// Thompson sampling: normalise `avg_reward` from the assumed `[-100, 0]`
/// range into a success rate, draw from `Beta(N·s, N·(1-s))`, pick the
/// largest draw. Unseen arms are tried first (§4.5, §9 Open Question c).
pub fn select_thompson<'a, R: Rng>(candidates: &[Candidate<'a>], rng: &mut R) -> Option<&'a str> {
    if candidates.is_empty() {
        return None;
    }
    if let Some(unseen) = candidates.iter().find(|c| c.arm.times_selected == 0) {
        return Some(unseen.plan_id);
    }
    candidates
        .iter()
        .map(|c| {
            let n = c.arm.times_selected as f64;
            let s = ((c.arm.avg_reward + 100.0) / 100.0).clamp(0.0, 1.0);
            let alpha = (n * s).max(1.0);
            let beta = (n * (1.0 - s)).max(1.0);
            let sample = Beta::new(alpha, beta).expect("alpha, beta >= 1.0").sample(rng);
            (c.plan_id, sample)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(plan_id, _)| plan_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn arm(times_selected: u64, avg_reward: f64) -> BanditArm {
        BanditArm {
            times_selected,
            total_reward: avg_reward * times_selected as f64,
            avg_reward,
            confidence: if times_selected == 0 { 1.0 } else { 1.0 / (times_selected as f64).sqrt() },
        }
    }

    #[test]
    fn ucb_prefers_unseen_arm() {
        let candidates = vec![
            Candidate { plan_id: "tried", arm: arm(10, -5.0) },
            Candidate { plan_id: "unseen", arm: BanditArm::unseen() },
        ];
        assert_eq!(select_ucb(&candidates, 0.2), Some("unseen"));
    }

    #[test]
    fn ucb_picks_higher_avg_reward_when_all_seen() {
        let candidates = vec![
            Candidate { plan_id: "worse", arm: arm(10, -50.0) },
            Candidate { plan_id: "better", arm: arm(10, -5.0) },
        ];
        assert_eq!(select_ucb(&candidates, 0.0), Some("better"));
    }

    #[test]
    fn thompson_prefers_unseen_arm() {
        let mut rng = rand::rngs::SmallRng::seed_from_u64(42);
        let candidates = vec![
            Candidate { plan_id: "tried", arm: arm(10, -5.0) },
            Candidate { plan_id: "unseen", arm: BanditArm::unseen() },
        ];
        assert_eq!(select_thompson(&candidates, &mut rng), Some("unseen"));
    }

    #[test]
    fn update_arm_accumulates_running_mean() {
        let arm = update_arm(BanditArm::unseen(), -10.0);
        assert_eq!(arm.times_selected, 1);
        assert_eq!(arm.total_reward, -10.0);
        assert_eq!(arm.avg_reward, -10.0);

        let arm = update_arm(arm, -30.0);
        assert_eq!(arm.times_selected, 2);
        assert_eq!(arm.total_reward, -40.0);
        assert_eq!(arm.avg_reward, -20.0);
    }

    #[test]
    fn thompson_is_deterministic_for_a_fixed_seed() {
        let candidates = vec![
            Candidate { plan_id: "a", arm: arm(10, -20.0) },
            Candidate { plan_id: "b", arm: arm(10, -5.0) },
        ];
        let mut rng1 = rand::rngs::SmallRng::seed_from_u64(7);
        let mut rng2 = rand::rngs::SmallRng::seed_from_u64(7);
        assert_eq!(select_thompson(&candidates, &mut rng1), select_thompson(&candidates, &mut rng2));
    }
}
