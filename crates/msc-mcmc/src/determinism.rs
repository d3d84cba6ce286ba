use msc_core::RngHandle;

/// Returns the random stream for the proposal made at `step`.
///
/// The same stream supplies the exponential draw and the accept/reject draw.
pub fn step_rng(master_seed: u64, step: usize) -> RngHandle {
    RngHandle::substream(master_seed, step as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msc_core::derive_substream_seed;
    use rand::RngCore;

    #[test]
    fn step_stream_is_the_step_substream() {
        let mut stream = step_rng(42, 7);
        let mut direct = RngHandle::from_seed(derive_substream_seed(42, 7));
        for _ in 0..8 {
            assert_eq!(stream.next_u64(), direct.next_u64());
        }
        assert_ne!(step_rng(42, 7).next_u64(), step_rng(42, 8).next_u64());
    }
}
