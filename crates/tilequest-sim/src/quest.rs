//! NPCs, dialog flow and quest objectives.
//!
//! Two NPCs exist: the quest giver near the player spawn, and the boss
//! quest NPC who sends the player after the Blue Golem and pays out once it
//! is dead.

use serde::{Deserialize, Serialize};
use tilequest_common::{Rect, Vec2};
use tracing::{debug, info};

use crate::progression::BOSS_QUEST_XP;

/// NPC sprite size.
pub const NPC_SIZE: Vec2 = Vec2::new(130.0, 130.0);
/// NPC idle frame count.
pub const NPC_FRAMES: u32 = 6;
/// Seconds per NPC idle frame.
pub const NPC_FRAME_DURATION: f32 = 0.2;
/// Objective slots.
pub const MAX_OBJECTIVES: usize = 3;

/// Objective granted by the quest giver.
pub const MAIN_QUEST_OBJECTIVE: &str = "Main Quest: Save My Little Brother";
/// Objective granted by the boss quest NPC.
pub const BOSS_QUEST_OBJECTIVE: &str = "Defeat the Boss Of the Territory";

const QUEST_GIVER_LINES: [&str; 6] = [
    "Welcome, warrior! Let me explain the basics of combat.",
    "Use the joystick to move, and the attack buttons to fight enemies.",
    "You can switch between melee and ranged weapons with the swap button.",
    "Your brother has been captured by the Blue Stronghold!",
    "You must infiltrate the stronghold and rescue him before it's too late!",
    "Good luck, and may the gods be with you!",
];

const BOSS_QUEST_LINES: [&str; 4] = [
    "Ah, brave warrior! I have an important quest for you.",
    "A terrible Blue Golem guards this territory.",
    "It terrorizes the local settlements and must be stopped!",
    "Defeat the Boss Of the Territory and return to me for a great reward!",
];

const COMPLETION_LINES: [&str; 2] = [
    "Incredible! You've defeated the Blue Golem!",
    "As promised, here is your reward. You've earned 1000 XP!",
];

// ============================================================================
// NPCs
// ============================================================================

/// Which NPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NpcKind {
    /// Quest giver near the spawn
    QuestGiver,
    /// Boss quest NPC
    BossQuest,
}

/// Which script an NPC is reading from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DialogScript {
    /// The NPC's regular lines
    #[default]
    Greeting,
    /// Boss quest reward lines
    Completion,
}

/// A talking NPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    /// Which NPC
    pub kind: NpcKind,
    /// Bounds
    pub rect: Rect,
    /// Idle frame
    pub frame: u32,
    frame_time: f32,
    /// Exclamation marker over the head
    pub show_exclamation: bool,
    /// Dialog open
    pub talking: bool,
    /// Current line
    pub dialog_index: usize,
    /// Script being read
    pub script: DialogScript,
}

impl Npc {
    /// Creates an NPC with its top-left at `position`.
    #[must_use]
    pub fn new(kind: NpcKind, position: Vec2) -> Self {
        Self {
            kind,
            rect: Rect::new(position.x, position.y, NPC_SIZE.x, NPC_SIZE.y),
            frame: 0,
            frame_time: 0.0,
            show_exclamation: true,
            talking: false,
            dialog_index: 0,
            script: DialogScript::Greeting,
        }
    }

    /// Lines of the current script.
    #[must_use]
    pub fn lines(&self) -> &'static [&'static str] {
        match (self.kind, self.script) {
            (_, DialogScript::Completion) => &COMPLETION_LINES,
            (NpcKind::QuestGiver, DialogScript::Greeting) => &QUEST_GIVER_LINES,
            (NpcKind::BossQuest, DialogScript::Greeting) => &BOSS_QUEST_LINES,
        }
    }

    /// Line being shown, if the dialog is open.
    #[must_use]
    pub fn current_line(&self) -> Option<&'static str> {
        if !self.talking {
            return None;
        }
        self.lines().get(self.dialog_index).copied()
    }

    /// Advances the idle animation.
    pub fn tick(&mut self, dt: f32) {
        self.frame_time += dt;
        if self.frame_time >= NPC_FRAME_DURATION {
            self.frame_time = 0.0;
            self.frame = (self.frame + 1) % NPC_FRAMES;
        }
    }

    fn open(&mut self, script: DialogScript) {
        self.talking = true;
        self.dialog_index = 0;
        self.script = script;
    }
}

// ============================================================================
// Objectives
// ============================================================================

/// A line in the objective tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    /// Text
    pub text: String,
    /// Shown
    pub active: bool,
}

/// Up to three objective slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestLog {
    objectives: Vec<Objective>,
}

impl QuestLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `text`: reactivates a matching slot, fills a free slot, reuses
    /// the first inactive slot, or overwrites the first slot.
    pub fn add(&mut self, text: &str) {
        if let Some(existing) = self.objectives.iter_mut().find(|o| o.text == text) {
            existing.active = true;
            return;
        }
        let objective = Objective {
            text: text.to_string(),
            active: true,
        };
        if self.objectives.len() < MAX_OBJECTIVES {
            self.objectives.push(objective);
        } else if let Some(slot) = self.objectives.iter_mut().find(|o| !o.active) {
            *slot = objective;
        } else {
            self.objectives[0] = objective;
        }
    }

    /// Hides `text`.
    pub fn remove(&mut self, text: &str) {
        if let Some(existing) = self.objectives.iter_mut().find(|o| o.text == text) {
            existing.active = false;
        }
    }

    /// Hides everything.
    pub fn clear(&mut self) {
        for objective in &mut self.objectives {
            objective.active = false;
        }
    }

    /// All slots.
    #[must_use]
    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Shown objective texts in slot order.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.objectives
            .iter()
            .filter(|o| o.active)
            .map(|o| o.text.as_str())
    }
}

// ============================================================================
// Quest state
// ============================================================================

/// Boss quest flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossQuest {
    /// Talked to the boss quest NPC
    pub started: bool,
    /// Blue Golem killed after the quest started
    pub boss_defeated: bool,
    /// Reward collected
    pub completed: bool,
}

/// Something the dialog flow changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestUpdate {
    /// An objective was shown
    ObjectiveAdded(String),
    /// An objective was hidden
    ObjectiveRemoved(String),
    /// The boss quest began
    BossQuestStarted,
    /// The boss quest paid out this much XP
    QuestCompleted {
        /// Reward
        xp: u32,
    },
}

/// NPCs, objectives and the boss quest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quests {
    /// Objective tracker
    pub log: QuestLog,
    /// Boss quest flags
    pub boss: BossQuest,
    /// Quest giver, if the map has a player spawn
    pub quest_giver: Option<Npc>,
    /// Boss quest NPC, if the map has yellow spawn points
    pub boss_npc: Option<Npc>,
}

impl Quests {
    /// Creates quest state around the given NPCs.
    #[must_use]
    pub fn new(quest_giver: Option<Npc>, boss_npc: Option<Npc>) -> Self {
        Self {
            log: QuestLog::new(),
            boss: BossQuest::default(),
            quest_giver,
            boss_npc,
        }
    }

    /// The NPC of `kind`.
    #[must_use]
    pub fn npc(&self, kind: NpcKind) -> Option<&Npc> {
        match kind {
            NpcKind::QuestGiver => self.quest_giver.as_ref(),
            NpcKind::BossQuest => self.boss_npc.as_ref(),
        }
    }

    fn npc_mut(&mut self, kind: NpcKind) -> Option<&mut Npc> {
        match kind {
            NpcKind::QuestGiver => self.quest_giver.as_mut(),
            NpcKind::BossQuest => self.boss_npc.as_mut(),
        }
    }

    /// NPCs in hit-test order (boss quest NPC first).
    pub fn npcs(&self) -> impl Iterator<Item = &Npc> {
        self.boss_npc.iter().chain(self.quest_giver.iter())
    }

    /// Advances NPC idle animations.
    pub fn tick(&mut self, dt: f32) {
        for npc in self.quest_giver.iter_mut().chain(self.boss_npc.iter_mut()) {
            npc.tick(dt);
        }
    }

    /// The NPC under a screen-space point, given the camera position.
    #[must_use]
    pub fn npc_at(&self, screen: Vec2, camera: Vec2) -> Option<NpcKind> {
        let world = screen + camera;
        self.npcs()
            .find(|npc| npc.rect.contains_point(world))
            .map(|npc| npc.kind)
    }

    /// Opens the dialog of `kind`. The caller must grant the XP of any
    /// [`QuestUpdate::QuestCompleted`] returned.
    pub fn start_dialog(&mut self, kind: NpcKind) -> Vec<QuestUpdate> {
        let boss = self.boss;
        let Some(npc) = self.npc_mut(kind) else {
            return Vec::new();
        };
        if npc.talking {
            return Vec::new();
        }

        let mut updates = Vec::new();
        match kind {
            NpcKind::BossQuest if boss.completed => {
                npc.open(DialogScript::Completion);
            },
            NpcKind::BossQuest if boss.boss_defeated => {
                npc.show_exclamation = false;
                npc.open(DialogScript::Completion);
                self.boss.completed = true;
                self.log.remove(BOSS_QUEST_OBJECTIVE);
                info!("Boss quest completed, +{} XP", BOSS_QUEST_XP);
                updates.push(QuestUpdate::ObjectiveRemoved(BOSS_QUEST_OBJECTIVE.to_string()));
                updates.push(QuestUpdate::QuestCompleted { xp: BOSS_QUEST_XP });
            },
            NpcKind::BossQuest if !boss.started => {
                npc.show_exclamation = false;
                npc.open(DialogScript::Greeting);
                self.boss.started = true;
                info!("Boss quest started");
                updates.push(QuestUpdate::BossQuestStarted);
            },
            _ => {
                npc.show_exclamation = false;
                npc.open(DialogScript::Greeting);
            },
        }
        debug!("Dialog with {:?} opened", kind);
        updates
    }

    /// Shows the next line of `kind`'s dialog, closing it after the last.
    pub fn advance_dialog(&mut self, kind: NpcKind) -> Vec<QuestUpdate> {
        let boss = self.boss;
        let Some(npc) = self.npc_mut(kind) else {
            return Vec::new();
        };
        if !npc.talking {
            return Vec::new();
        }

        npc.dialog_index += 1;
        if npc.dialog_index < npc.lines().len() {
            return Vec::new();
        }
        npc.talking = false;
        debug!("Dialog with {:?} closed", kind);

        let mut updates = Vec::new();
        match kind {
            NpcKind::QuestGiver => {
                self.log.add(MAIN_QUEST_OBJECTIVE);
                updates.push(QuestUpdate::ObjectiveAdded(MAIN_QUEST_OBJECTIVE.to_string()));
            },
            NpcKind::BossQuest if !boss.completed && !boss.boss_defeated => {
                self.boss.started = true;
                self.log.add(BOSS_QUEST_OBJECTIVE);
                updates.push(QuestUpdate::ObjectiveAdded(BOSS_QUEST_OBJECTIVE.to_string()));
            },
            NpcKind::BossQuest => {},
        }
        updates
    }

    /// Records a Blue Golem kill. Counts only while the quest is running;
    /// returns true when it did.
    pub fn mark_boss_defeated(&mut self) -> bool {
        if !self.boss.started || self.boss.boss_defeated {
            return false;
        }
        self.boss.boss_defeated = true;
        if let Some(npc) = self.boss_npc.as_mut() {
            npc.show_exclamation = true;
        }
        info!("Blue Golem defeated, return to the quest NPC");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quests() -> Quests {
        Quests::new(
            Some(Npc::new(NpcKind::QuestGiver, Vec2::new(0.0, 0.0))),
            Some(Npc::new(NpcKind::BossQuest, Vec2::new(500.0, 0.0))),
        )
    }

    fn read_through(q: &mut Quests, kind: NpcKind) -> Vec<QuestUpdate> {
        let mut all = q.start_dialog(kind);
        while q.npc(kind).is_some_and(|n| n.talking) {
            all.extend(q.advance_dialog(kind));
        }
        all
    }

    #[test]
    fn test_objective_slots() {
        let mut log = QuestLog::new();
        log.add("a");
        log.add("b");
        log.add("c");
        log.add("a");
        assert_eq!(log.objectives().len(), 3);

        log.add("d");
        assert_eq!(log.objectives()[0].text, "d");

        log.remove("b");
        log.add("e");
        assert_eq!(log.active().collect::<Vec<_>>(), vec!["d", "e", "c"]);

        log.clear();
        assert_eq!(log.active().count(), 0);
        log.add("c");
        assert_eq!(log.active().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_quest_giver_dialog_adds_main_quest() {
        let mut q = quests();
        q.start_dialog(NpcKind::QuestGiver);
        let npc = q.npc(NpcKind::QuestGiver).expect("npc");
        assert!(!npc.show_exclamation);
        assert_eq!(npc.current_line(), Some(QUEST_GIVER_LINES[0]));

        // Starting again while talking is ignored.
        q.advance_dialog(NpcKind::QuestGiver);
        q.start_dialog(NpcKind::QuestGiver);
        assert_eq!(q.npc(NpcKind::QuestGiver).map(|n| n.dialog_index), Some(1));

        let mut updates = Vec::new();
        for _ in 0..5 {
            updates.extend(q.advance_dialog(NpcKind::QuestGiver));
        }
        assert_eq!(
            updates,
            vec![QuestUpdate::ObjectiveAdded(MAIN_QUEST_OBJECTIVE.to_string())]
        );
        assert!(q.npc(NpcKind::QuestGiver).is_some_and(|n| !n.talking));
    }

    #[test]
    fn test_boss_quest_full_flow() {
        let mut q = quests();
        assert!(!q.mark_boss_defeated());

        let updates = read_through(&mut q, NpcKind::BossQuest);
        assert_eq!(
            updates,
            vec![
                QuestUpdate::BossQuestStarted,
                QuestUpdate::ObjectiveAdded(BOSS_QUEST_OBJECTIVE.to_string()),
            ]
        );
        assert!(q.boss.started);

        assert!(q.mark_boss_defeated());
        assert!(!q.mark_boss_defeated());
        assert!(q.boss_npc.as_ref().is_some_and(|n| n.show_exclamation));

        let updates = read_through(&mut q, NpcKind::BossQuest);
        assert_eq!(
            updates,
            vec![
                QuestUpdate::ObjectiveRemoved(BOSS_QUEST_OBJECTIVE.to_string()),
                QuestUpdate::QuestCompleted { xp: 1000 },
            ]
        );
        assert!(q.boss.completed);
        assert_eq!(q.log.active().count(), 0);

        // Talking again only replays the completion lines.
        q.start_dialog(NpcKind::BossQuest);
        let npc = q.npc(NpcKind::BossQuest).expect("npc");
        assert_eq!(npc.script, DialogScript::Completion);
        assert_eq!(npc.current_line(), Some(COMPLETION_LINES[0]));
        assert!(read_through(&mut q, NpcKind::BossQuest).is_empty());
    }

    #[test]
    fn test_npc_at_checks_boss_first() {
        let mut q = quests();
        if let Some(boss) = q.boss_npc.as_mut() {
            boss.rect = Rect::new(50.0, 50.0, 130.0, 130.0);
        }
        let camera = Vec2::new(10.0, 10.0);
        assert_eq!(q.npc_at(Vec2::new(50.0, 50.0), camera), Some(NpcKind::BossQuest));
        assert_eq!(q.npc_at(Vec2::new(0.0, 0.0), camera), Some(NpcKind::QuestGiver));
        assert_eq!(q.npc_at(Vec2::new(900.0, 900.0), camera), None);
    }

    #[test]
    fn test_npc_idle_animation_loops() {
        let mut npc = Npc::new(NpcKind::QuestGiver, Vec2::ZERO);
        for _ in 0..7 {
            npc.tick(0.21);
        }
        assert_eq!(npc.frame, 1);
    }
}
