//! Built-in function and condition lowering.
//!
//! Every name the source language does not resolve to a user-defined
//! function reaches this module. Argument parsing is deliberately
//! permissive about compile-time-vs-runtime: anywhere the original
//! compiler's action record has a literal field (a player index, a unit
//! id, a location), this crate requires the call-site argument to have
//! already folded to a literal by the time it gets here, and reports a
//! semantic error naming the offending argument otherwise. Anywhere the
//! record has a "quantity" field, a runtime expression is accepted and
//! lowered to a register.

use umsc_asm::{Instruction, Quantity, UnitOrder};
use umsc_types::{AllianceStatus, ConditionComparison, EndGameType, LeaderboardType, ModifyType, UnitPropType};

use crate::ast::{Node, Scope};
use crate::error::{CompileError, Result};
use crate::ir::lower::Lowerer;

fn arg<'a>(args: &'a [Node], i: usize, call: &str) -> Result<&'a Node> {
    args.get(i).ok_or_else(|| {
        CompileError::Semantic(format!("\"{call}\" is missing argument {}", i + 1))
    })
}

fn literal_number(node: &Node, call: &str, which: &str) -> Result<i64> {
    match node {
        Node::Number(n) => Ok(*n),
        _ => Err(CompileError::Semantic(format!(
            "\"{call}\"'s {which} argument must be a compile-time constant"
        ))),
    }
}

fn literal_string<'a>(node: &'a Node, call: &str, which: &str) -> Result<&'a str> {
    match node {
        Node::Str(s) => Ok(s.as_str()),
        _ => Err(CompileError::Semantic(format!(
            "\"{call}\"'s {which} argument must be a string literal"
        ))),
    }
}

fn player(args: &[Node], i: usize, call: &str) -> Result<u8> {
    Ok(literal_number(arg(args, i, call)?, call, "player")? as u8)
}

fn unit_id(args: &[Node], i: usize, call: &str) -> Result<u16> {
    Ok(literal_number(arg(args, i, call)?, call, "unit")? as u16)
}

fn location(lw: &mut Lowerer, args: &[Node], i: usize, call: &str) -> Result<u8> {
    let name = literal_string(arg(args, i, call)?, call, "location")?;
    lw.resolve_location(name)
}

fn quantity(lw: &mut Lowerer, args: &[Node], i: usize, call: &str, scope: &Scope) -> Result<Quantity> {
    lw.lower_expr(arg(args, i, call)?, scope)
}

/// Dispatches a call that is not a user-defined function. Returns `Some`
/// for intrinsics that produce a value usable in an expression context.
pub fn lower_call(lw: &mut Lowerer, name: &str, args: &[Node], scope: &Scope) -> Result<Option<Quantity>> {
    match name {
        "print" | "display_msg" => {
            let text = literal_string(arg(args, 0, name)?, name, "message")?;
            let id = lw.intern_string(text);
            let player = match args.get(1) {
                Some(n) => Some(literal_number(n, name, "player")? as u8),
                None => None,
            };
            lw.emit(Instruction::DisplayMsg { text: id, player });
            Ok(None)
        }
        "wait" => {
            let ms = literal_number(arg(args, 0, name)?, name, "duration")? as u32;
            lw.emit(Instruction::Wait { milliseconds: ms });
            Ok(None)
        }
        "end" => {
            let p = player(args, 0, name)?;
            let outcome = match literal_string(arg(args, 1, name)?, name, "outcome")? {
                "victory" => EndGameType::Victory,
                "defeat" => EndGameType::Defeat,
                "draw" => EndGameType::Draw,
                other => {
                    return Err(CompileError::Semantic(format!("unknown end() outcome \"{other}\"")))
                }
            };
            lw.emit(Instruction::EndGame { player: p, outcome });
            Ok(None)
        }
        "spawn" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let count = quantity(lw, args, 2, name, scope)?;
            let loc = location(lw, args, 3, name)?;
            let props_slot = match args.get(4) {
                Some(Node::UnitProperties(props)) => Some(lw.alloc_cuwp(props.clone())?),
                Some(_) => {
                    return Err(CompileError::Semantic(
                        "spawn()'s fifth argument, if present, must be a unit properties block".into(),
                    ))
                }
                None => None,
            };
            lw.emit(Instruction::Spawn { player: p, unit_id: unit, count, location: loc, props_slot });
            Ok(None)
        }
        "kill" => emit_unit_count_action(lw, name, args, scope, |player, unit_id, count, location| {
            Instruction::Kill { player, unit_id, count, location }
        }),
        "remove" => emit_unit_count_action(lw, name, args, scope, |player, unit_id, count, location| {
            Instruction::Remove { player, unit_id, count, location }
        }),
        "move_unit" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let count = quantity(lw, args, 2, name, scope)?;
            let src = location(lw, args, 3, name)?;
            let dst = location(lw, args, 4, name)?;
            lw.emit(Instruction::Move { player: p, unit_id: unit, count, src, dst });
            Ok(None)
        }
        "order" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let order_name = literal_string(arg(args, 2, name)?, name, "order")?;
            let order = Lowerer::unit_order_from_name(order_name).ok_or_else(|| {
                CompileError::Semantic(format!("unknown order \"{order_name}\""))
            })?;
            let src = location(lw, args, 3, name)?;
            let dst = location(lw, args, 4, name)?;
            lw.emit(Instruction::Order { player: p, unit_id: unit, order, src, dst });
            Ok(None)
        }
        "modify_unit" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let modify = match literal_string(arg(args, 2, name)?, name, "property")? {
                "hp" => ModifyType::HitPoints,
                "energy" => ModifyType::Energy,
                "shields" => ModifyType::ShieldPoints,
                "hangar" => ModifyType::HangarCount,
                other => {
                    return Err(CompileError::Semantic(format!("unknown modify_unit() property \"{other}\"")))
                }
            };
            let amount = literal_number(arg(args, 3, name)?, name, "amount")? as u32;
            let count = quantity(lw, args, 4, name, scope)?;
            let loc = location(lw, args, 5, name)?;
            lw.emit(Instruction::Modify { player: p, unit_id: unit, count, amount, modify, location: loc });
            Ok(None)
        }
        "give" => {
            let src = player(args, 0, name)?;
            let dst = player(args, 1, name)?;
            let unit = unit_id(args, 2, name)?;
            let count = quantity(lw, args, 3, name, scope)?;
            let loc = location(lw, args, 4, name)?;
            lw.emit(Instruction::Give { src_player: src, dst_player: dst, unit_id: unit, count, location: loc });
            Ok(None)
        }
        "set_resource" => resource_action(lw, name, args, scope, |player, resource_ore, count| {
            Instruction::SetResource { player, resource_ore, count }
        }),
        "inc_resource" => resource_action(lw, name, args, scope, |player, resource_ore, count| {
            Instruction::IncResource { player, resource_ore, count }
        }),
        "dec_resource" => resource_action(lw, name, args, scope, |player, resource_ore, count| {
            Instruction::DecResource { player, resource_ore, count }
        }),
        "set_score" => score_action(lw, name, args, scope, |player, count| Instruction::SetScore { player, count }),
        "inc_score" => score_action(lw, name, args, scope, |player, count| Instruction::IncScore { player, count }),
        "dec_score" => score_action(lw, name, args, scope, |player, count| Instruction::DecScore { player, count }),
        "set_countdown" => countdown_action(lw, name, args, scope, Instruction::SetCountdown),
        "inc_countdown" => countdown_action(lw, name, args, scope, Instruction::AddCountdown),
        "dec_countdown" => countdown_action(lw, name, args, scope, Instruction::SubCountdown),
        "pause_countdown" => {
            lw.emit(Instruction::PauseCountdown { unpause: false });
            Ok(None)
        }
        "unpause_countdown" => {
            lw.emit(Instruction::PauseCountdown { unpause: true });
            Ok(None)
        }
        "mute_unit_speech" => {
            lw.emit(Instruction::MuteUnitSpeech { unmute: false });
            Ok(None)
        }
        "unmute_unit_speech" => {
            lw.emit(Instruction::MuteUnitSpeech { unmute: true });
            Ok(None)
        }
        "set_deaths" => deaths_action(lw, name, args, scope, |player, unit_id, count| {
            Instruction::SetDeaths { player, unit_id, count }
        }),
        "inc_deaths" => deaths_action(lw, name, args, scope, |player, unit_id, count| {
            Instruction::IncDeaths { player, unit_id, count }
        }),
        "dec_deaths" => deaths_action(lw, name, args, scope, |player, unit_id, count| {
            Instruction::DecDeaths { player, unit_id, count }
        }),
        "center_view" => {
            let loc = location(lw, args, 0, name)?;
            lw.emit(Instruction::CenterView { location: loc });
            Ok(None)
        }
        "minimap_ping" => {
            let loc = location(lw, args, 0, name)?;
            lw.emit(Instruction::Ping { location: loc });
            Ok(None)
        }
        "talk" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let ms = literal_number(arg(args, 2, name)?, name, "duration")? as u32;
            lw.emit(Instruction::Talk { player: p, unit_id: unit, time_ms: ms });
            Ok(None)
        }
        "play_sound" => {
            let wav_name = literal_string(arg(args, 0, name)?, name, "file")?;
            let wav = lw.intern_string(wav_name);
            let player = match args.get(1) {
                Some(_) => Some(player(args, 1, name)?),
                None => None,
            };
            let duration_ms = match args.get(2) {
                Some(n) => Some(literal_number(n, name, "duration")? as u32),
                None => None,
            };
            lw.emit(Instruction::PlayWAV { player, wav, duration_ms });
            Ok(None)
        }
        "transmission" => {
            let text = literal_string(arg(args, 0, name)?, name, "text")?;
            let text_id = lw.intern_string(text);
            let unit = unit_id(args, 1, name)?;
            let loc = location(lw, args, 2, name)?;
            let ms = literal_number(arg(args, 3, name)?, name, "duration")? as u32;
            let wav = match args.get(4) {
                Some(n) => Some(lw.intern_string(literal_string(n, name, "wav")?)),
                None => None,
            };
            lw.emit(Instruction::Transmission { text: text_id, unit_id: unit, wav, location: loc, time_ms: ms });
            Ok(None)
        }
        "set_doodad" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let loc = location(lw, args, 2, name)?;
            let enabled = literal_number(arg(args, 3, name)?, name, "enabled")? != 0;
            lw.emit(Instruction::SetDoodad { player: p, unit_id: unit, location: loc, enabled });
            Ok(None)
        }
        "set_invincible" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let loc = location(lw, args, 2, name)?;
            let enabled = literal_number(arg(args, 3, name)?, name, "enabled")? != 0;
            lw.emit(Instruction::SetInvincible { player: p, unit_id: unit, location: loc, enabled });
            Ok(None)
        }
        "run_ai_script" => {
            let p = player(args, 0, name)?;
            let script = literal_string(arg(args, 1, name)?, name, "script")?;
            let mut bytes = [b' '; 4];
            for (slot, byte) in bytes.iter_mut().zip(script.as_bytes()) {
                *slot = *byte;
            }
            let loc = match args.get(2) {
                Some(_) => Some(location(lw, args, 2, name)?),
                None => None,
            };
            lw.emit(Instruction::AIScript { player: p, script_name: bytes, location: loc });
            Ok(None)
        }
        "set_alliance" => {
            let p = player(args, 0, name)?;
            let target = player(args, 1, name)?;
            let status = match literal_string(arg(args, 2, name)?, name, "status")? {
                "enemy" => AllianceStatus::Enemy,
                "ally" => AllianceStatus::Ally,
                "allied_victory" => AllianceStatus::AlliedVictory,
                other => {
                    return Err(CompileError::Semantic(format!("unknown set_alliance() status \"{other}\"")))
                }
            };
            lw.emit(Instruction::SetAlly { player: p, target_player: target, status });
            Ok(None)
        }
        "set_objectives" => {
            let p = player(args, 0, name)?;
            let text = literal_string(arg(args, 1, name)?, name, "text")?;
            let id = lw.intern_string(text);
            lw.emit(Instruction::SetObj { player: p, text: id });
            Ok(None)
        }
        "pause_game" => {
            lw.emit(Instruction::PauseGame { unpause: false });
            Ok(None)
        }
        "unpause_game" => {
            lw.emit(Instruction::PauseGame { unpause: true });
            Ok(None)
        }
        "leaderboard_cpu_show" => {
            lw.emit(Instruction::LeaderboardCpu { shown: true });
            Ok(None)
        }
        "leaderboard_cpu_hide" => {
            lw.emit(Instruction::LeaderboardCpu { shown: false });
            Ok(None)
        }
        "leaderboard" => {
            let text = literal_string(arg(args, 0, name)?, name, "text")?;
            let text_id = lw.intern_string(text);
            let kind = match literal_string(arg(args, 1, name)?, name, "kind")? {
                "control_at_location" => LeaderboardType::ControlAtLocation,
                "control" => LeaderboardType::Control,
                "greed" => LeaderboardType::Greed,
                "kills" => LeaderboardType::Kills,
                "points" => LeaderboardType::Points,
                "resources" => LeaderboardType::Resources,
                other => {
                    return Err(CompileError::Semantic(format!("unknown leaderboard() kind \"{other}\"")))
                }
            };
            let goal = match args.get(2) {
                Some(n) => Some(literal_number(n, name, "goal")? as u32),
                None => None,
            };
            let loc = match kind {
                LeaderboardType::ControlAtLocation => Some(location(lw, args, 3, name)?),
                _ => None,
            };
            lw.emit(Instruction::Leaderboard { text: text_id, kind, goal, location: loc });
            Ok(None)
        }
        "rnd256" => {
            lw.emit(Instruction::Rnd256);
            let scratch = umsc_types::ReservedRegister::Temp0.id();
            lw.emit(Instruction::Pop(scratch));
            Ok(Some(Quantity::Register(scratch)))
        }
        "is_present" => {
            let players: Result<Vec<u8>> =
                args.iter().enumerate().map(|(i, a)| Ok(literal_number(a, name, "player")? as u8)).collect();
            let players = players?;
            lw.emit(Instruction::IsPresent(players));
            let scratch = umsc_types::ReservedRegister::Temp0.id();
            lw.emit(Instruction::Pop(scratch));
            Ok(Some(Quantity::Register(scratch)))
        }
        "poll_events" => {
            lw.emit(Instruction::ChkPlayers);
            Ok(None)
        }
        _ => Err(CompileError::Semantic(format!("unknown function \"{name}\""))),
    }
}

fn emit_unit_count_action(
    lw: &mut Lowerer,
    name: &str,
    args: &[Node],
    scope: &Scope,
    make: impl FnOnce(u8, u16, Quantity, u8) -> Instruction,
) -> Result<Option<Quantity>> {
    let p = player(args, 0, name)?;
    let unit = unit_id(args, 1, name)?;
    let count = quantity(lw, args, 2, name, scope)?;
    let loc = location(lw, args, 3, name)?;
    lw.emit(make(p, unit, count, loc));
    Ok(None)
}

fn resource_action(
    lw: &mut Lowerer,
    name: &str,
    args: &[Node],
    scope: &Scope,
    make: impl FnOnce(u8, bool, Quantity) -> Instruction,
) -> Result<Option<Quantity>> {
    let p = player(args, 0, name)?;
    let ore = match literal_string(arg(args, 1, name)?, name, "resource")? {
        "ore" | "minerals" => true,
        "gas" => false,
        other => return Err(CompileError::Semantic(format!("unknown resource \"{other}\""))),
    };
    let count = quantity(lw, args, 2, name, scope)?;
    lw.emit(make(p, ore, count));
    Ok(None)
}

fn score_action(
    lw: &mut Lowerer,
    name: &str,
    args: &[Node],
    scope: &Scope,
    make: impl FnOnce(u8, Quantity) -> Instruction,
) -> Result<Option<Quantity>> {
    let p = player(args, 0, name)?;
    let count = quantity(lw, args, 1, name, scope)?;
    lw.emit(make(p, count));
    Ok(None)
}

fn countdown_action(
    lw: &mut Lowerer,
    name: &str,
    args: &[Node],
    scope: &Scope,
    make: impl FnOnce(Quantity) -> Instruction,
) -> Result<Option<Quantity>> {
    let count = quantity(lw, args, 0, name, scope)?;
    lw.emit(make(count));
    Ok(None)
}

fn deaths_action(
    lw: &mut Lowerer,
    name: &str,
    args: &[Node],
    scope: &Scope,
    make: impl FnOnce(u8, u16, Quantity) -> Instruction,
) -> Result<Option<Quantity>> {
    let p = player(args, 0, name)?;
    let unit = unit_id(args, 1, name)?;
    let count = quantity(lw, args, 2, name, scope)?;
    lw.emit(make(p, unit, count));
    Ok(None)
}

fn comparison(args: &[Node], i: usize, call: &str) -> Result<(ConditionComparison, u32)> {
    let cmp = match literal_string(arg(args, i, call)?, call, "comparison")? {
        "at_least" => ConditionComparison::AtLeast,
        "at_most" => ConditionComparison::AtMost,
        "exactly" => ConditionComparison::Exactly,
        other => return Err(CompileError::Semantic(format!("unknown comparison \"{other}\""))),
    };
    let qty = literal_number(arg(args, i + 1, call)?, call, "quantity")? as u32;
    Ok((cmp, qty))
}

/// Lowers a single condition inside an `event { ... }` block.
pub fn lower_condition(lw: &mut Lowerer, name: &str, args: &[Node]) -> Result<()> {
    match name {
        "bring" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let loc = location(lw, args, 2, name)?;
            let (comparison, quantity) = comparison(args, 3, name)?;
            lw.emit(Instruction::BringCond { player: p, unit_id: unit, location: loc, comparison, quantity });
        }
        "accum" => {
            let p = player(args, 0, name)?;
            let ore = match literal_string(arg(args, 1, name)?, name, "resource")? {
                "ore" | "minerals" => true,
                "gas" => false,
                other => return Err(CompileError::Semantic(format!("unknown resource \"{other}\""))),
            };
            let (comparison, quantity) = comparison(args, 2, name)?;
            lw.emit(Instruction::AccumCond { player: p, resource_ore: ore, comparison, quantity });
        }
        "least_resources" => {
            let p = player(args, 0, name)?;
            let ore = literal_string(arg(args, 1, name)?, name, "resource")? == "ore";
            lw.emit(Instruction::LeastResCond { player: p, resource_ore: ore });
        }
        "most_resources" => {
            let p = player(args, 0, name)?;
            let ore = literal_string(arg(args, 1, name)?, name, "resource")? == "ore";
            lw.emit(Instruction::MostResCond { player: p, resource_ore: ore });
        }
        "score" => {
            let p = player(args, 0, name)?;
            let kind = literal_number(arg(args, 1, name)?, name, "kind")? as u8;
            let (comparison, quantity) = comparison(args, 2, name)?;
            lw.emit(Instruction::ScoreCond { player: p, score_kind: kind, comparison, quantity });
        }
        "highest_score" => {
            let p = player(args, 0, name)?;
            let kind = literal_number(arg(args, 1, name)?, name, "kind")? as u8;
            lw.emit(Instruction::HiScoreCond { player: p, score_kind: kind });
        }
        "lowest_score" => {
            let p = player(args, 0, name)?;
            let kind = literal_number(arg(args, 1, name)?, name, "kind")? as u8;
            lw.emit(Instruction::LowScoreCond { player: p, score_kind: kind });
        }
        "elapsed_time" => {
            let (comparison, quantity) = comparison(args, 0, name)?;
            lw.emit(Instruction::TimeCond { comparison, quantity });
        }
        "commands" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let (comparison, quantity) = comparison(args, 2, name)?;
            lw.emit(Instruction::CmdCond { player: p, unit_id: unit, comparison, quantity });
        }
        "commands_least" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            lw.emit(Instruction::CmdLeastCond { player: p, unit_id: unit });
        }
        "commands_most" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            lw.emit(Instruction::CmdMostCond { player: p, unit_id: unit });
        }
        "kills" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let (comparison, quantity) = comparison(args, 2, name)?;
            lw.emit(Instruction::KillCond { player: p, unit_id: unit, comparison, quantity });
        }
        "kills_least" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            lw.emit(Instruction::KillLeastCond { player: p, unit_id: unit });
        }
        "kills_most" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            lw.emit(Instruction::KillMostCond { player: p, unit_id: unit });
        }
        "deaths" => {
            let p = player(args, 0, name)?;
            let unit = unit_id(args, 1, name)?;
            let (comparison, quantity) = comparison(args, 2, name)?;
            lw.emit(Instruction::DeathCond { player: p, unit_id: unit, comparison, quantity });
        }
        "countdown" => {
            let (comparison, time_ms) = comparison(args, 0, name)?;
            lw.emit(Instruction::CountdownCond { comparison, time_ms });
        }
        "opponents" => {
            let p = player(args, 0, name)?;
            let (comparison, quantity) = comparison(args, 1, name)?;
            lw.emit(Instruction::OpponentsCond { player: p, comparison, quantity });
        }
        _ => return Err(CompileError::Semantic(format!("unknown condition \"{name}\""))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Ast;
    use crate::ir::lower::Lowerer;

    fn with_main() -> Ast {
        Ast::new(vec![Node::FunctionDeclaration { name: "main".into(), params: vec![], body: vec![] }])
    }

    #[test]
    fn print_interns_its_string_once() {
        let ast = with_main();
        let mut lw = Lowerer::new(&ast);
        let scope = Scope::Global;
        lower_call(&mut lw, "print", &[Node::Str("hi".into())], &scope).unwrap();
        lower_call(&mut lw, "print", &[Node::Str("hi".into())], &scope).unwrap();
        let program = lw.lower().unwrap();
        assert_eq!(program.strings, vec!["hi".to_string()]);
    }

    #[test]
    fn unknown_function_is_a_semantic_error() {
        let ast = with_main();
        let mut lw = Lowerer::new(&ast);
        let err = lower_call(&mut lw, "not_a_real_function", &[], &Scope::Global).unwrap_err();
        assert!(matches!(err, CompileError::Semantic(_)));
    }

    #[test]
    fn play_sound_reads_player_from_its_own_argument_not_the_wav_string_index() {
        let ast = with_main();
        let mut lw = Lowerer::new(&ast);
        lower_call(
            &mut lw,
            "play_sound",
            &[Node::Str("explosion.wav".into()), Node::Number(3)],
            &Scope::Global,
        )
        .unwrap();
        let program = lw.lower().unwrap();
        let play = program
            .instructions
            .iter()
            .find_map(|i| match i {
                Instruction::PlayWAV { player, wav, .. } => Some((*player, *wav)),
                _ => None,
            })
            .expect("play_sound should emit a PlayWAV instruction");
        assert_eq!(play.0, Some(3), "player must come from argument 1, not the wav string id");
        assert_ne!(play.1, 0, "a real file name must not collide with the reserved empty string slot");
    }

    #[test]
    fn play_sound_without_a_player_argument_leaves_it_unset() {
        let ast = with_main();
        let mut lw = Lowerer::new(&ast);
        lower_call(&mut lw, "play_sound", &[Node::Str("explosion.wav".into())], &Scope::Global).unwrap();
        let program = lw.lower().unwrap();
        let player = program.instructions.iter().find_map(|i| match i {
            Instruction::PlayWAV { player, .. } => Some(*player),
            _ => None,
        });
        assert_eq!(player, Some(None));
    }
}
