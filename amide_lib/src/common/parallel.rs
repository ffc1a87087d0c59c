use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{EngineError, Result};

/// Thread count matching the machine, at least one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Return `Cancelled` once the flag is raised
pub fn check_cancel(cancel: Option<&AtomicBool>) -> Result<()> {
    match cancel {
        Some(flag) if flag.load(Ordering::Relaxed) => Err(EngineError::Cancelled),
        _ => Ok(()),
    }
}

/// Split `buffer` into bands of whole units (`unit_len` elements each, e.g. one image row
/// or one z-layer) and process them on up to `threads` scoped threads.
///
/// `work` gets the index of the first unit in its band and the band itself.
/// Bands never overlap, so every worker writes exclusively into its own slice.
/// The first error in band order is returned.
pub fn for_each_band<T, F>(buffer: &mut [T], unit_len: usize, threads: usize, work: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Sync,
{
    if unit_len == 0 || buffer.is_empty() {
        return Ok(());
    }
    let units = buffer.len() / unit_len;
    let threads = threads.clamp(1, units.max(1));

    if threads == 1 {
        return work(0, buffer);
    }

    let units_per_band = (units + threads - 1) / threads; // ceil
    log::debug!("Splitting {units} units into bands of {units_per_band} on {threads} threads");

    crossbeam::scope(|scope| {
        let work = &work;
        let handles: Vec<_> = buffer
            .chunks_mut(units_per_band * unit_len)
            .enumerate()
            .map(|(band_id, band)| scope.spawn(move |_| work(band_id * units_per_band, band)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Result<()>>()
    })
    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bands_cover_buffer() {
        let mut buffer = vec![0usize; 7 * 5];
        for_each_band(&mut buffer, 5, 3, |first_unit, band| {
            for (i, row) in band.chunks_mut(5).enumerate() {
                row.iter_mut().for_each(|v| *v = first_unit + i);
            }
            Ok(())
        })
        .unwrap();

        for (row_id, row) in buffer.chunks(5).enumerate() {
            assert!(row.iter().all(|&v| v == row_id));
        }
    }

    #[test]
    fn single_thread_gets_everything() {
        let mut buffer = vec![1u8; 12];
        for_each_band(&mut buffer, 4, 1, |first_unit, band| {
            assert_eq!(first_unit, 0);
            assert_eq!(band.len(), 12);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn error_propagates() {
        let mut buffer = vec![0u8; 16];
        let res = for_each_band(&mut buffer, 2, 4, |first_unit, _| {
            if first_unit >= 4 {
                Err(EngineError::Cancelled)
            } else {
                Ok(())
            }
        });
        assert!(matches!(res, Err(EngineError::Cancelled)));
    }

    #[test]
    fn cancel_flag() {
        let flag = AtomicBool::new(false);
        assert!(check_cancel(Some(&flag)).is_ok());
        assert!(check_cancel(None).is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(check_cancel(Some(&flag)), Err(EngineError::Cancelled)));
    }
}
