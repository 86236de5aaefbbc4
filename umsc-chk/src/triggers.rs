use umsc_types::ConditionComparison;

use crate::chunk::RawChunk;
use crate::error::Result;

bitflags::bitflags! {
    /// Per-condition flag byte. `Disabled` lets the assembler emit a
    /// placeholder condition slot (all 16 must be filled) that never
    /// actually participates in evaluation.
    #[derive(Default)]
    pub struct ConditionFlags: u8 {
        const DISABLED = 1 << 1;
        const ALWAYS_DISPLAY = 1 << 2;
        const UNIT_PROPERTIES_USED = 1 << 3;
        const UNIT_TYPE_USED = 1 << 4;
        const UNIT_ID_USED = 1 << 5;
    }
}

bitflags::bitflags! {
    /// Per-action flag byte. `IgnoreWaitOnce` is what lets the assembler
    /// re-run the same trigger every round-robin pass instead of the
    /// editor's default "run once" behaviour.
    #[derive(Default)]
    pub struct ActionFlags: u8 {
        const IGNORE_WAIT_ONCE = 1 << 0;
        const DISABLED = 1 << 1;
        const ALWAYS_DISPLAY = 1 << 2;
        const UNIT_PROPERTIES_USED = 1 << 3;
        const UNIT_TYPE_USED = 1 << 4;
        const UNIT_ID_USED = 1 << 5;
    }
}

/// The condition opcode written into a trigger record's `m_Condition`
/// field. Every IR condition instruction (`BringCond`, `AccumCond`, ...)
/// lowers to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum TriggerConditionType {
    NoCondition = 0,
    CountdownTimer = 1,
    Command = 2,
    Bring = 3,
    Accumulate = 4,
    Kill = 5,
    CommandTheLeast = 6,
    CommandTheLeastAt = 7,
    CommandTheMost = 8,
    CommandTheMostAt = 9,
    MostKills = 10,
    HighestScore = 11,
    MostResources = 12,
    Switch = 13,
    ElapsedTime = 14,
    Opponents = 16,
    Deaths = 17,
    CommandTheLeastResources = 18,
    LowestScore = 19,
    LeastResources = 20,
    Score = 21,
    Always = 22,
    Never = 23,
}

/// The action opcode written into a trigger record's `m_ActionType` field.
/// Every IR action instruction lowers to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum TriggerActionType {
    NoAction = 0,
    Victory = 1,
    Defeat = 2,
    PreserveTrigger = 3,
    Wait = 4,
    PauseGame = 5,
    UnpauseGame = 6,
    Transmission = 7,
    PlayWav = 8,
    DisplayTextMessage = 9,
    CenterView = 10,
    CreateUnitWithProperties = 11,
    SetMissionObjectives = 12,
    SetSwitch = 13,
    SetCountdownTimer = 14,
    RunAiScript = 15,
    RunAiScriptAtLocation = 16,
    LeaderboardControl = 17,
    LeaderboardControlAtLocation = 18,
    LeaderboardResources = 19,
    LeaderboardKills = 20,
    LeaderboardPoints = 21,
    KillUnit = 22,
    KillUnitAtLocation = 23,
    RemoveUnit = 24,
    RemoveUnitAtLocation = 25,
    SetResources = 26,
    SetScore = 27,
    MinimapPing = 28,
    TalkingPortrait = 29,
    MuteUnitSpeech = 30,
    UnmuteUnitSpeech = 31,
    LeaderboardComputerPlayers = 32,
    LeaderboardGoalControl = 33,
    LeaderboardGoalControlAtLocation = 34,
    LeaderboardGoalResources = 35,
    LeaderboardGoalKills = 36,
    LeaderboardGoalPoints = 37,
    MoveLocation = 38,
    MoveUnit = 39,
    LeaderboardGreed = 40,
    SetNextScenario = 41,
    SetDoodadState = 42,
    SetInvincibility = 43,
    CreateUnit = 44,
    SetDeaths = 45,
    Order = 46,
    Comment = 47,
    GiveUnitsToPlayer = 48,
    ModifyUnitHitPoints = 49,
    ModifyUnitEnergy = 50,
    ModifyUnitShieldPoints = 51,
    ModifyUnitHangarCount = 52,
    PauseTimer = 53,
    UnpauseTimer = 54,
    Draw = 55,
    SetAllianceStatus = 56,
}

/// One 20-byte condition slot of a trigger record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerCondition {
    /// 1-based location, 0 for none.
    pub location: u32,
    /// Player/player-group index the condition tests.
    pub group: u32,
    /// Quantity or resource amount the condition compares against.
    pub quantity: u32,
    pub unit_id: u16,
    pub comparison: u8,
    pub condition_type: u8,
    /// Resource type, score type or 0-based switch number.
    pub arg0: u8,
    pub flags: u8,
}

impl TriggerCondition {
    const LEN: usize = 20;

    fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.location.to_le_bytes());
        out[4..8].copy_from_slice(&self.group.to_le_bytes());
        out[8..12].copy_from_slice(&self.quantity.to_le_bytes());
        out[12..14].copy_from_slice(&self.unit_id.to_le_bytes());
        out[14] = self.comparison;
        out[15] = self.condition_type;
        out[16] = self.arg0;
        out[17] = self.flags;
        out
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            location: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            group: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            quantity: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            unit_id: u16::from_le_bytes(bytes[12..14].try_into().unwrap()),
            comparison: bytes[14],
            condition_type: bytes[15],
            arg0: bytes[16],
            flags: bytes[17],
        }
    }
}

pub(crate) fn comparison_byte(c: ConditionComparison) -> u8 {
    c as u8
}

/// One 32-byte action slot of a trigger record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerAction {
    /// 1-based source/only location, 0 for none.
    pub source: u32,
    /// String-table index of the action's text, 0 for none.
    pub trigger_text: u32,
    /// String-table index of a WAV name, 0 for none.
    pub wav_string_index: u32,
    pub milliseconds: u32,
    /// Player or player-group affected.
    pub group: u32,
    /// Second group, destination location, CUWP slot or 0-based switch.
    pub arg0: u32,
    /// Unit type, score type, resource type or alliance status.
    pub arg1: u16,
    pub action_type: u8,
    /// Unit count (0 = all units), action state, order or number modifier.
    pub modifier: u8,
    pub flags: u8,
}

impl TriggerAction {
    const LEN: usize = 32;

    fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..4].copy_from_slice(&self.source.to_le_bytes());
        out[4..8].copy_from_slice(&self.trigger_text.to_le_bytes());
        out[8..12].copy_from_slice(&self.wav_string_index.to_le_bytes());
        out[12..16].copy_from_slice(&self.milliseconds.to_le_bytes());
        out[16..20].copy_from_slice(&self.group.to_le_bytes());
        out[20..24].copy_from_slice(&self.arg0.to_le_bytes());
        out[24..26].copy_from_slice(&self.arg1.to_le_bytes());
        out[26] = self.action_type;
        out[27] = self.modifier;
        out[28] = self.flags;
        out
    }

    fn decode(bytes: &[u8]) -> Self {
        Self {
            source: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            trigger_text: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            wav_string_index: u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            milliseconds: u32::from_le_bytes(bytes[12..16].try_into().unwrap()),
            group: u32::from_le_bytes(bytes[16..20].try_into().unwrap()),
            arg0: u32::from_le_bytes(bytes[20..24].try_into().unwrap()),
            arg1: u16::from_le_bytes(bytes[24..26].try_into().unwrap()),
            action_type: bytes[26],
            modifier: bytes[27],
            flags: bytes[28],
        }
    }
}

/// One fixed 2400-byte trigger record: 16 condition slots, 64 action
/// slots, an execution-flags word, and a 28-byte per-player execution
/// bitmask. Every record is this size regardless of how many of its
/// condition/action slots are actually in use; unused slots are filled
/// with `NoCondition`/`NoAction` placeholders.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub conditions: [TriggerCondition; 16],
    pub actions: [TriggerAction; 64],
    pub execution_flags: u32,
    pub execution_mask: [u8; 28],
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            conditions: [TriggerCondition::default(); 16],
            actions: [TriggerAction::default(); 64],
            execution_flags: 0,
            execution_mask: [0; 28],
        }
    }
}

impl Trigger {
    /// Encoded size of a single trigger record in bytes.
    pub const ENCODED_LEN: usize = 16 * TriggerCondition::LEN + 64 * TriggerAction::LEN + 4 + 28;

    fn encode(&self, out: &mut Vec<u8>) {
        for c in &self.conditions {
            out.extend_from_slice(&c.encode());
        }
        for a in &self.actions {
            out.extend_from_slice(&a.encode());
        }
        out.extend_from_slice(&self.execution_flags.to_le_bytes());
        out.extend_from_slice(&self.execution_mask);
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut conditions = [TriggerCondition::default(); 16];
        for (i, slot) in conditions.iter_mut().enumerate() {
            let off = i * TriggerCondition::LEN;
            *slot = TriggerCondition::decode(&bytes[off..off + TriggerCondition::LEN]);
        }

        let actions_off = 16 * TriggerCondition::LEN;
        let mut actions = [TriggerAction::default(); 64];
        for (i, slot) in actions.iter_mut().enumerate() {
            let off = actions_off + i * TriggerAction::LEN;
            *slot = TriggerAction::decode(&bytes[off..off + TriggerAction::LEN]);
        }

        let flags_off = actions_off + 64 * TriggerAction::LEN;
        let execution_flags = u32::from_le_bytes(bytes[flags_off..flags_off + 4].try_into().unwrap());
        let mut execution_mask = [0u8; 28];
        execution_mask.copy_from_slice(&bytes[flags_off + 4..flags_off + 4 + 28]);

        Self { conditions, actions, execution_flags, execution_mask }
    }
}

static_assertions::const_assert_eq!(Trigger::ENCODED_LEN, 2400);

/// The `TRIG` chunk: the flat sequence of every trigger record in the map,
/// back to back with no length prefix per record (the record size is
/// fixed, so the chunk's own length divided by 2400 gives the count).
#[derive(Debug, Clone, Default)]
pub struct TriggersChunk {
    pub triggers: Vec<Trigger>,
}

impl TriggersChunk {
    /// Creates an empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trigger record, returning its index.
    pub fn push(&mut self, trigger: Trigger) -> usize {
        self.triggers.push(trigger);
        self.triggers.len() - 1
    }

    /// Encodes the chunk as a `TRIG` chunk payload.
    pub fn to_raw_chunk(&self) -> RawChunk {
        let mut out = Vec::with_capacity(self.triggers.len() * Trigger::ENCODED_LEN);
        for t in &self.triggers {
            t.encode(&mut out);
        }
        RawChunk::new("TRIG", out)
    }

    /// Decodes a `TRIG` chunk payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let count = bytes.len() / Trigger::ENCODED_LEN;
        let triggers = (0..count)
            .map(|i| {
                let off = i * Trigger::ENCODED_LEN;
                Trigger::decode(&bytes[off..off + Trigger::ENCODED_LEN])
            })
            .collect();
        Ok(Self { triggers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_encode_decode_round_trips() {
        let condition = TriggerCondition {
            location: 5,
            group: 1,
            quantity: 100,
            unit_id: 7,
            comparison: comparison_byte(ConditionComparison::AtLeast),
            condition_type: TriggerConditionType::Bring as u8,
            arg0: 0,
            flags: ConditionFlags::UNIT_ID_USED.bits(),
        };
        let decoded = TriggerCondition::decode(&condition.encode());
        assert_eq!(decoded.location, condition.location);
        assert_eq!(decoded.quantity, condition.quantity);
        assert_eq!(decoded.unit_id, condition.unit_id);
        assert_eq!(decoded.condition_type, condition.condition_type);
        assert_eq!(decoded.flags, condition.flags);
    }

    #[test]
    fn action_encode_decode_round_trips() {
        let action = TriggerAction {
            source: 9,
            trigger_text: 3,
            wav_string_index: 0,
            milliseconds: 1000,
            group: 2,
            arg0: 42,
            arg1: 11,
            action_type: TriggerActionType::DisplayTextMessage as u8,
            modifier: 0,
            flags: ActionFlags::IGNORE_WAIT_ONCE.bits(),
        };
        let decoded = TriggerAction::decode(&action.encode());
        assert_eq!(decoded.source, action.source);
        assert_eq!(decoded.trigger_text, action.trigger_text);
        assert_eq!(decoded.arg0, action.arg0);
        assert_eq!(decoded.action_type, action.action_type);
        assert_eq!(decoded.flags, action.flags);
    }

    #[test]
    fn triggers_chunk_round_trips_through_to_raw_chunk() {
        let mut chunk = TriggersChunk::new();
        let mut trigger = Trigger::default();
        trigger.conditions[0].condition_type = TriggerConditionType::Always as u8;
        trigger.actions[0].action_type = TriggerActionType::Victory as u8;
        chunk.push(trigger);

        let raw = chunk.to_raw_chunk();
        assert_eq!(raw.tag_str(), "TRIG");
        assert_eq!(raw.bytes.len(), Trigger::ENCODED_LEN);

        let decoded = TriggersChunk::from_bytes(&raw.bytes).unwrap();
        assert_eq!(decoded.triggers.len(), 1);
        assert_eq!(decoded.triggers[0].conditions[0].condition_type, TriggerConditionType::Always as u8);
        assert_eq!(decoded.triggers[0].actions[0].action_type, TriggerActionType::Victory as u8);
    }

    #[test]
    fn push_returns_the_new_trigger_s_index() {
        let mut chunk = TriggersChunk::new();
        assert_eq!(chunk.push(Trigger::default()), 0);
        assert_eq!(chunk.push(Trigger::default()), 1);
    }
}
