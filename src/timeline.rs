//! Trace reconstruction: per-SM, per-instruction timing samples to events.

use crate::{
    ClockRateMhz, KernTraceError, KernTraceResult, MIN_EVENT_SLOTS, Phase, Tensor3, TraceArgs,
    TraceEvent, WorkerRole, operation_name,
};

/// Build one complete event per valid `(sm, instruction)` sample for `role`.
///
/// Samples with a non-positive start or end cycle, or whose end does not
/// come after the start, are dropped. Shape problems abort the whole build.
pub fn build_events(
    timings: &Tensor3,
    instructions: &Tensor3,
    role: WorkerRole,
    clock: ClockRateMhz,
) -> KernTraceResult<Vec<TraceEvent>> {
    let slots = role.slots();
    let [num_sms, queue_len, depth] = timings.shape();
    let [instr_sms, instr_queue_len, fields] = instructions.shape();

    if (num_sms, queue_len) != (instr_sms, instr_queue_len) {
        return Err(KernTraceError::ShapeMismatch(format!(
            "timings are [{num_sms}, {queue_len}, _] but instructions are [{instr_sms}, {instr_queue_len}, _]"
        )));
    }
    if num_sms > 0 && queue_len > 0 {
        let required = MIN_EVENT_SLOTS.max(slots.end + 1);
        if depth < required {
            return Err(KernTraceError::ShapeMismatch(format!(
                "{role} needs {required} event slots per timing record, got {depth}"
            )));
        }
        if fields == 0 {
            return Err(KernTraceError::ShapeMismatch(
                "instruction records have no opcode field".to_string(),
            ));
        }
    }

    let mut events = Vec::new();
    let mut skipped = 0usize;
    for sm_id in 0..num_sms {
        for instr_idx in 0..queue_len {
            let start_cycles = timings.get(sm_id, instr_idx, slots.start).unwrap_or(0);
            let end_cycles = timings.get(sm_id, instr_idx, slots.end).unwrap_or(0);
            if start_cycles <= 0 || end_cycles <= 0 {
                skipped += 1;
                continue;
            }

            let start_us = clock.cycles_to_us(start_cycles);
            let end_us = clock.cycles_to_us(end_cycles);
            let duration_us = end_us - start_us;
            // End before start is dropped as-is, never flipped.
            if duration_us <= 0.0 {
                skipped += 1;
                continue;
            }

            let opcode = instructions.get(sm_id, instr_idx, 0).unwrap_or(0);
            let operation = operation_name(opcode).into_owned();

            events.push(TraceEvent {
                name: format!("{operation}:{role}"),
                ph: Phase::Complete,
                ts: start_us,
                dur: duration_us,
                pid: sm_id,
                tid: role,
                args: TraceArgs {
                    sm_id,
                    instruction_index: instr_idx,
                    opcode,
                    operation,
                    start_cycles,
                    end_cycles,
                    start_us,
                    end_us,
                },
            });
        }
    }

    tracing::debug!(
        "{role}: {} events, {skipped} samples skipped over {num_sms} SMs",
        events.len()
    );
    Ok(events)
}
