use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Local};

use crate::model::Plan;
use crate::msg::{Cmd, Msg};
use crate::ops::labels::apply_label_changes;
use crate::io::store::{PlanStore, batch_label_summary};

/// Plan bodies for the demo dataset, embedded at compile time.
const DEMO_CONTENT_JSON: &str = include_str!("demo_content.json");

/// In-memory state while demo mode is active.
#[derive(Default)]
pub struct DemoState {
    pub active: bool,
    pub plans: Vec<Plan>,
    pub content: HashMap<String, String>,
}

fn demo_plan(file: &str, status: &str, label: &str, title: &str, days_ago: i64) -> Plan {
    let t = Local::now() - ChronoDuration::days(days_ago);
    Plan {
        dir: PathBuf::from("demo"),
        file: file.to_string(),
        status: status.to_string(),
        project: String::new(),
        labels: vec![label.to_string()],
        title: title.to_string(),
        created: t,
        modified: t,
        has_comments: false,
    }
}

/// The synthetic plan list shown in demo mode.
pub fn demo_plans() -> Vec<Plan> {
    vec![
        demo_plan("glowing-spinning-falcon.md", "active", "planc", "Terminal dashboard for plan management", 0),
        demo_plan("optimistic-watering-pi.md", "", "garden", "Raspberry Pi irrigation controller", 1),
        demo_plan("humble-returning-sandwich.md", "active", "lunch", "Descope back to a Slack bot", 2),
        demo_plan("competitive-flexing-sneaker.md", "active", "fittrack", "Add social challenges and leaderboard", 3),
        demo_plan("eager-pulsing-heart.md", "reviewed", "fittrack", "Add heart rate zone training", 4),
        demo_plan("relieved-idiomatic-gopher.md", "done", "planc", "Rewrite back in Go because lifetimes", 6),
        demo_plan("reflective-documenting-octopus.md", "active", "agent", "Write comprehensive postmortem", 8),
        demo_plan("ambitious-routing-van.md", "done", "lunch", "Pivot to full delivery logistics platform", 9),
        demo_plan("sunset-selling-octopus.md", "done", "agent", "Sunset personal agent and sell remaining IP", 11),
        demo_plan("panicked-revoking-octopus.md", "done", "agent", "Emergency rollback after agent negotiated my rent", 12),
        demo_plan("blazing-fast-crab.md", "done", "planc", "Rewrite in Rust for performance", 13),
        demo_plan("reckless-negotiating-tentacle.md", "done", "agent", "Let personal agent handle purchases and negotiation", 15),
        demo_plan("hungry-learning-fork.md", "done", "lunch", "Add restaurant recommendation engine", 16),
        demo_plan("eager-orchestrating-claw.md", "done", "agent", "Personal agent alpha for inbox and calendar triage", 18),
        demo_plan("humbled-stepping-shoe.md", "done", "fittrack", "Remove ML, just count steps", 20),
        demo_plan("simple-ordering-bot.md", "done", "lunch", "Slack bot for lunch orders", 24),
        demo_plan("eager-classifying-neuron.md", "done", "fittrack", "Add ML-powered activity recognition", 30),
        demo_plan("tiny-listing-script.md", "done", "planc", "Shell script to list plan files", 34),
        demo_plan("fresh-counting-pedometer.md", "done", "fittrack", "Step counter CLI tool", 42),
    ]
}

/// Parse the embedded demo bodies. The asset is compile-time constant,
/// so a parse failure is a build defect.
pub fn demo_plan_contents() -> HashMap<String, String> {
    serde_json::from_str(DEMO_CONTENT_JSON).expect("demo_content.json")
}

/// Store over the in-memory demo plans. Returns the same message shapes
/// as the disk store with no I/O.
pub struct DemoStore {
    pub plans: Vec<Plan>,
}

impl PlanStore for DemoStore {
    fn set_status(&self, plan: &Plan, status: &str) -> Cmd {
        let old = plan.clone();
        let status = status.to_string();
        Box::new(move || {
            let mut new = old.clone();
            new.status = status;
            Some(Msg::StatusUpdated {
                old: Box::new(old),
                new: Box::new(new),
            })
        })
    }

    fn set_labels(&self, plan: &Plan, labels: Vec<String>) -> Cmd {
        let old = plan.clone();
        Box::new(move || {
            let mut new = old.clone();
            new.labels = labels;
            new.project = String::new();
            Some(Msg::LabelsUpdated { plan: Box::new(new) })
        })
    }

    fn delete_plan(&self, plan: &Plan) -> Cmd {
        let remaining: Vec<Plan> = self
            .plans
            .iter()
            .filter(|p| p.path() != plan.path())
            .cloned()
            .collect();
        Box::new(move || Some(Msg::Reload { plans: remaining }))
    }

    fn batch_set_status(&self, paths: Vec<String>, status: &str) -> Cmd {
        let status = status.to_string();
        let mut updated = self.plans.clone();
        Box::new(move || {
            let path_set: HashSet<String> = paths.iter().cloned().collect();
            for p in &mut updated {
                if path_set.contains(&p.path_string()) {
                    p.status = status.clone();
                }
            }
            let label = if status.is_empty() { "unset" } else { status.as_str() };
            Some(Msg::BatchDone {
                plans: updated,
                message: format!("{} plans → {}", paths.len(), label),
                paths,
            })
        })
    }

    fn batch_update_labels(
        &self,
        paths: Vec<String>,
        add: Vec<String>,
        remove: Vec<String>,
    ) -> Cmd {
        let mut updated = self.plans.clone();
        Box::new(move || {
            let path_set: HashSet<String> = paths.iter().cloned().collect();
            for p in &mut updated {
                if path_set.contains(&p.path_string()) {
                    p.labels = apply_label_changes(&p.labels, &add, &remove);
                    p.project = String::new();
                }
            }
            let message = batch_label_summary(paths.len(), &add, &remove, 0);
            Some(Msg::BatchDone {
                plans: updated,
                message,
                paths,
            })
        })
    }
}

// ─── Fake assistant screen ──────────────────────────────────────────────
//
// Pressing enter or c on a plan in demo mode opens a full-screen fake
// "Clod Code" session: a canned animation of response blocks, tool calls,
// and thinking indicators, then a prompt that exits on enter.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClodStepKind {
    /// ● response text block
    Text,
    /// ● ToolName(args) with ⎿ output
    ToolCall,
    /// ✻ thinking indicator (only the latest is shown)
    Thinking,
}

pub struct ClodStep {
    pub kind: ClodStepKind,
    pub text: &'static str,
    pub output: &'static str,
    pub delay: Duration,
}

/// The fixed animation script. `{file}` is replaced with the plan
/// filename at render time.
pub const CLOD_SCRIPT: [ClodStep; 6] = [
    ClodStep {
        kind: ClodStepKind::Thinking,
        text: "Percolating",
        output: "",
        delay: Duration::from_millis(1500),
    },
    ClodStep {
        kind: ClodStepKind::Text,
        text: "Let me read through this plan to give you a thorough review.",
        output: "",
        delay: Duration::from_millis(400),
    },
    ClodStep {
        kind: ClodStepKind::ToolCall,
        text: "Read {file}",
        output: "",
        delay: Duration::from_millis(400),
    },
    ClodStep {
        kind: ClodStepKind::Thinking,
        text: "Kneading",
        output: "",
        delay: Duration::from_millis(1200),
    },
    ClodStep {
        kind: ClodStepKind::Thinking,
        text: "Marinating",
        output: "",
        delay: Duration::from_millis(1400),
    },
    ClodStep {
        kind: ClodStepKind::Text,
        text: "The scope is well-defined and the milestones are in a good\norder. A few things stood out:\n\n1. The architecture section is clean — splitting by concern\n   makes each piece independently testable.\n\n2. I'd recommend adding an explicit error handling strategy\n   before starting implementation.\n\n3. The third milestone has some implicit dependencies on the\n   first two that should be called out.\n\nWant me to start implementing?",
        output: "",
        delay: Duration::from_millis(0),
    },
];

/// State for the fake assistant screen.
#[derive(Default)]
pub struct ClodState {
    pub active: bool,
    /// Animation finished; the bottom prompt is accepting input
    pub done: bool,
    /// Generation counter — stale ticks are ignored
    pub tick_id: u64,
    pub plan_file: String,
    pub label: String,
    /// Pre-filled prompt text (prefix + filename)
    pub preamble: String,
    /// Characters typed at the bottom prompt
    pub input: String,
    /// Index into CLOD_SCRIPT; -1 before the first step
    pub step: isize,
}

impl ClodState {
    /// Advance one step. Returns the delay before the next tick, or None
    /// when the script has finished.
    pub fn advance(&mut self) -> Option<Duration> {
        self.step += 1;
        if self.step as usize >= CLOD_SCRIPT.len() {
            self.done = true;
            return None;
        }
        Some(CLOD_SCRIPT[self.step as usize].delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_content_parses_and_matches_plans() {
        let content = demo_plan_contents();
        assert!(!content.is_empty());
        let files: Vec<String> = demo_plans().iter().map(|p| p.file.clone()).collect();
        for key in content.keys() {
            assert!(files.contains(key), "orphan demo content: {}", key);
        }
    }

    #[test]
    fn test_demo_store_set_status_shape() {
        let plans = demo_plans();
        let store = DemoStore {
            plans: plans.clone(),
        };
        let msg = (store.set_status(&plans[0], "done"))().unwrap();
        match msg {
            Msg::StatusUpdated { old, new } => {
                assert_eq!(old.file, plans[0].file);
                assert_eq!(new.status, "done");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_demo_store_batch_labels() {
        let plans = demo_plans();
        let store = DemoStore {
            plans: plans.clone(),
        };
        let paths = vec![plans[0].path_string(), plans[1].path_string()];
        let msg =
            (store.batch_update_labels(paths.clone(), vec!["urgent".into()], vec![]))().unwrap();
        match msg {
            Msg::BatchDone { plans, message, .. } => {
                assert_eq!(message, "2 plans +urgent");
                let touched: Vec<&Plan> = plans
                    .iter()
                    .filter(|p| paths.contains(&p.path_string()))
                    .collect();
                assert_eq!(touched.len(), 2);
                assert!(touched.iter().all(|p| p.labels.contains(&"urgent".to_string())));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_demo_store_delete_removes_plan() {
        let plans = demo_plans();
        let store = DemoStore {
            plans: plans.clone(),
        };
        let msg = (store.delete_plan(&plans[0]))().unwrap();
        match msg {
            Msg::Reload { plans: remaining } => {
                assert_eq!(remaining.len(), plans.len() - 1);
                assert!(!remaining.iter().any(|p| p.file == plans[0].file));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_clod_advance_runs_script_to_done() {
        let mut clod = ClodState {
            step: -1,
            ..ClodState::default()
        };
        let mut steps = 0;
        while clod.advance().is_some() {
            steps += 1;
            assert!(steps <= CLOD_SCRIPT.len());
        }
        assert!(clod.done);
        assert_eq!(clod.step as usize, CLOD_SCRIPT.len());
    }
}
