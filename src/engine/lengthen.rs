//! The per-cycle pass that extends every derived set from its raw data.
use strum::IntoEnumIterator;

use crate::config::DF;
use crate::config::constants::{A_DAY, AN_HOUR};
use crate::domain::Family;
use crate::engine::downsample::{Downsample, lengthen_set};
use crate::models::{BinFamily, ChartData};

fn lengthen_zoomed<S: Downsample>(family: &mut BinFamily<S>) -> usize {
    let BinFamily { raw, hour, day } = family;
    lengthen_set(raw, hour, AN_HOUR) + lengthen_set(raw, day, A_DAY)
}

impl ChartData {
    /// Normalise every family, back-fill mempool heights, then append the hour and day
    /// buckets completed since the last pass. Returns the number of derived points added.
    pub fn lengthen(&mut self) -> usize {
        crate::trace_time!("ChartData::lengthen", 20_000, {
            for family in Family::iter() {
                self.normalize_family(family);
            }

            let filled = self
                .mempool
                .raw
                .backfill_heights(&self.propagation.time, &self.propagation.heights);

            let mempool = lengthen_zoomed(&mut self.mempool);
            let pow = lengthen_zoomed(&mut self.pow);
            let vsp = lengthen_zoomed(&mut self.vsp);
            let exchange: usize = self.exchange.values_mut().map(lengthen_zoomed).sum();
            let snapshot = lengthen_zoomed(&mut self.nodes)
                + lengthen_zoomed(&mut self.locations)
                + lengthen_zoomed(&mut self.versions);
            let days = lengthen_set(&self.blocks, &mut self.days, A_DAY);

            if DF.log_lengthen {
                log::info!(
                    "lengthen: mempool +{} ({} heights filled), pow +{}, vsp +{}, exchange +{}, snapshot +{}, days +{}",
                    mempool,
                    filled,
                    pow,
                    vsp,
                    exchange,
                    snapshot,
                    days
                );
            }
            mempool + pow + vsp + exchange + snapshot + days
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{BlockRecord, MempoolRecord, PropagationRecord};
    use crate::models::ChartData;

    fn mempool(time: u64, size: u64) -> MempoolRecord {
        MempoolRecord {
            time,
            size,
            tx_count: 1,
            total_fee: 0.5,
        }
    }

    #[test]
    fn test_lengthen_is_incremental() {
        let mut data = ChartData::default();
        let records: Vec<_> = [0, 1800, 3600, 5400, 7200]
            .into_iter()
            .map(|t| mempool(t, t / 1800))
            .collect();
        data.mempool.raw.append_records(&records);

        assert_eq!(data.lengthen(), 2);
        assert_eq!(data.mempool.hour.time.0, vec![0, 3600]);
        assert_eq!(data.mempool.hour.size.0, vec![0, 2]);
        assert_eq!(data.lengthen(), 0);

        data.mempool.raw.append_records(&[mempool(9000, 5), mempool(10800, 6)]);
        assert_eq!(data.lengthen(), 1);
        assert_eq!(data.mempool.hour.time.0, vec![0, 3600, 7200]);
    }

    #[test]
    fn test_mempool_heights_follow_propagation() {
        let mut data = ChartData::default();
        data.mempool.raw.append_records(&[mempool(50, 1), mempool(150, 2), mempool(250, 3)]);
        data.propagation.append_records(&[
            PropagationRecord {
                height: 10,
                time: 100,
                ..Default::default()
            },
            PropagationRecord {
                height: 11,
                time: 200,
                ..Default::default()
            },
        ]);
        data.lengthen();
        // 250 has no later block yet, so it stays unassigned.
        assert_eq!(data.mempool.raw.heights.0, vec![0, 10]);
    }

    #[test]
    fn test_blocks_roll_up_to_days() {
        let mut data = ChartData::default();
        let block = |height, time| BlockRecord {
            height,
            time,
            block_size: 100,
            ..Default::default()
        };
        data.blocks
            .append_records(&[block(1, 0), block(2, 43_200), block(3, 86_400)]);
        assert_eq!(data.lengthen(), 1);
        assert_eq!(data.days.heights.0, vec![1]);
        assert_eq!(data.days.block_size.0, vec![200]);
    }
}
