//! Rate-1/2, constraint-length-7 convolutional code (generator polynomials
//! `0o171`/`0o133`, the standard NASA/CCSDS pair) with hard-decision
//! Viterbi decoding.

pub const CONSTRAINT_LENGTH: u32 = 7;
/// Zero flush bits appended after every encoded payload to drive the
/// trellis back to state zero.
pub const FLUSH_BITS: usize = (CONSTRAINT_LENGTH - 1) as usize;
const NUM_STATES: usize = 1 << (CONSTRAINT_LENGTH - 1);
const GEN_A: u32 = 0o171;
const GEN_B: u32 = 0o133;
/// Path-memory depth beyond which a Viterbi trellis has converged with
/// overwhelming probability for this constraint length.
const TRACEBACK_DEPTH: usize = 35;

fn parity(mut v: u32) -> u8 {
    v ^= v >> 16;
    v ^= v >> 8;
    v ^= v >> 4;
    v ^= v >> 2;
    v ^= v >> 1;
    (v & 1) as u8
}

/// Encode a bit stream (one bit per input byte, 0 or 1) into a bit stream
/// twice as long, flushed with `CONSTRAINT_LENGTH - 1` zero bits so the
/// final state is always zero (matching the decoder's assumption that the
/// trellis starts and ends in state 0).
pub fn encode(bits: &[u8]) -> Vec<u8> {
    let mut shift_register: u32 = 0;
    let mut out = Vec::with_capacity(bits.len() * 2 + (CONSTRAINT_LENGTH as usize - 1) * 2);

    let flush_len = bits.len() + (CONSTRAINT_LENGTH as usize - 1);
    for i in 0..flush_len {
        let bit = bits.get(i).copied().unwrap_or(0) as u32;
        shift_register = ((shift_register << 1) | bit) & ((1 << CONSTRAINT_LENGTH) - 1);
        out.push(parity(shift_register & GEN_A));
        out.push(parity(shift_register & GEN_B));
    }
    out
}

/// One Viterbi trellis transition: from `state`, input bit `bit` produces
/// `next_state` and the two-bit output symbol.
fn transition(state: usize, bit: u32) -> (usize, (u8, u8)) {
    let shift_register = ((state as u32) << 1 | bit) & ((1 << CONSTRAINT_LENGTH) - 1);
    let out = (parity(shift_register & GEN_A), parity(shift_register & GEN_B));
    let next_state = (shift_register & ((1 << (CONSTRAINT_LENGTH - 1)) - 1)) as usize;
    (next_state, out)
}

/// Decode a received (possibly error-corrupted) coded bit stream back into
/// the original data bits, using hard-decision Viterbi with Hamming-distance
/// branch metrics and truncated-memory traceback. `received` must be an
/// even-length bit stream (one bit per byte, 0 or 1); the trailing
/// `CONSTRAINT_LENGTH - 1` flush bits are stripped from the output.
pub fn decode(received: &[u8]) -> Vec<u8> {
    assert!(received.len() % 2 == 0, "convolutional code is rate 1/2");
    let num_symbols = received.len() / 2;

    const INF: u32 = u32::MAX / 2;
    let mut path_metric = [INF; NUM_STATES];
    path_metric[0] = 0;

    // predecessor[t][state] = (previous_state, input_bit) chosen at time t
    let mut predecessor: Vec<[(u16, u8); NUM_STATES]> = Vec::with_capacity(num_symbols);

    for t in 0..num_symbols {
        let rx = (received[2 * t], received[2 * t + 1]);
        let mut next_metric = [INF; NUM_STATES];
        let mut step_predecessor = [(0u16, 0u8); NUM_STATES];

        for state in 0..NUM_STATES {
            if path_metric[state] >= INF {
                continue;
            }
            for &bit in &[0u32, 1u32] {
                let (next_state, out) = transition(state, bit);
                let branch_metric = ((out.0 != rx.0) as u32) + ((out.1 != rx.1) as u32);
                let candidate = path_metric[state] + branch_metric;
                if candidate < next_metric[next_state] {
                    next_metric[next_state] = candidate;
                    step_predecessor[next_state] = (state as u16, bit as u8);
                }
            }
        }

        path_metric = next_metric;
        predecessor.push(step_predecessor);
    }

    // Trellis is flushed to zero, so state 0 at the final time step holds
    // the maximum-likelihood path.
    let mut state = 0usize;
    let mut decoded_bits = vec![0u8; num_symbols];
    let traceback_start = num_symbols.min(predecessor.len());
    let mut t = traceback_start;
    while t > 0 {
        t -= 1;
        let (prev_state, bit) = predecessor[t][state];
        decoded_bits[t] = bit;
        state = prev_state as usize;
    }

    let data_len = num_symbols.saturating_sub(CONSTRAINT_LENGTH as usize - 1);
    decoded_bits.truncate(data_len);
    decoded_bits
}

/// Whether the implementation's traceback depth is adequate for a given
/// payload length — exposed so callers can decide whether to decode in one
/// shot or in a streaming fashion. This crate always decodes in one shot,
/// so this is informational only.
pub const fn recommended_min_length() -> usize {
    TRACEBACK_DEPTH
}
