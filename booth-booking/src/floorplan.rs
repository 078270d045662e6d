//! Floor plan auto-layout.
//!
//! Booths created without a position are placed on a grid so the admin
//! floor plan editor has something to drag around. Booths are ordered by
//! hall, then event, then booth number (case-insensitively), filled left to
//! right, and each hall is pushed down by a fixed offset so halls do not
//! overlap.

use crate::types::{Booth, BoothId, Coordinates};

/// Hall name used for booths without a location
pub const DEFAULT_HALL: &str = "Default Hall";

/// Grid geometry of the floor plan canvas
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutGrid {
    /// Canvas width
    pub canvas_width: f64,
    /// Canvas height
    pub canvas_height: f64,
    /// Booth rectangle width
    pub booth_width: f64,
    /// Booth rectangle height
    pub booth_height: f64,
    /// Left and top margin
    pub padding: f64,
    /// Horizontal gap between booths
    pub column_gap: f64,
    /// Vertical gap between booths
    pub row_gap: f64,
    /// Vertical offset added per hall
    pub hall_offset: f64,
}

impl Default for LayoutGrid {
    fn default() -> Self {
        Self {
            canvas_width: 1000.0,
            canvas_height: 500.0,
            booth_width: 60.0,
            booth_height: 40.0,
            padding: 40.0,
            column_gap: 30.0,
            row_gap: 30.0,
            hall_offset: 150.0,
        }
    }
}

impl LayoutGrid {
    /// Booths per row, never less than one
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // floored and clamped
    pub fn columns(&self) -> usize {
        let usable = self.canvas_width - self.padding * 2.0 + self.column_gap;
        let columns = (usable / (self.booth_width + self.column_gap)).floor();
        if columns.is_finite() && columns >= 1.0 {
            columns as usize
        } else {
            1
        }
    }

    /// Assign coordinates to every booth that has none
    ///
    /// Booths that already have coordinates are left out of the result and
    /// do not take a grid slot.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // grid indices are small
    pub fn place<'a, I>(&self, booths: I) -> Vec<(BoothId, Coordinates)>
    where
        I: IntoIterator<Item = &'a Booth>,
    {
        let mut unplaced: Vec<&Booth> = booths
            .into_iter()
            .filter(|booth| booth.coordinates.is_none())
            .collect();

        unplaced.sort_by_cached_key(|booth| {
            (
                booth.location.to_lowercase(),
                booth.event.to_lowercase(),
                booth.number.to_lowercase(),
            )
        });

        let mut halls: Vec<&str> = Vec::new();
        for booth in &unplaced {
            let hall = hall_name(booth);
            if !halls.contains(&hall) {
                halls.push(hall);
            }
        }

        let columns = self.columns();

        unplaced
            .iter()
            .enumerate()
            .map(|(index, booth)| {
                let hall_index = halls
                    .iter()
                    .position(|hall| *hall == hall_name(booth))
                    .unwrap_or_default();
                let column = (index % columns) as f64;
                let row = (index / columns) as f64;

                let coordinates = Coordinates {
                    x: self.padding + column * (self.booth_width + self.column_gap),
                    y: self.padding
                        + row * (self.booth_height + self.row_gap)
                        + hall_index as f64 * self.hall_offset,
                };
                (booth.id, coordinates)
            })
            .collect()
    }
}

fn hall_name(booth: &Booth) -> &str {
    if booth.location.is_empty() {
        DEFAULT_HALL
    } else {
        &booth.location
    }
}

/// Lay out booths on the default grid
#[must_use]
pub fn auto_layout<'a, I>(booths: I) -> Vec<(BoothId, Coordinates)>
where
    I: IntoIterator<Item = &'a Booth>,
{
    LayoutGrid::default().place(booths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoothStatus, Money};
    use proptest::prelude::*;

    fn booth(number: &str, event: &str, hall: &str) -> Booth {
        Booth {
            id: BoothId::new(),
            number: number.to_string(),
            event: event.to_string(),
            event_id: None,
            date: String::new(),
            location: hall.to_string(),
            size: String::new(),
            size_label: String::new(),
            price: Money::ZERO,
            note: String::new(),
            status: BoothStatus::Available,
            features: Vec::new(),
            description: String::new(),
            exhibitor: None,
            coordinates: None,
        }
    }

    fn position_of(layout: &[(BoothId, Coordinates)], id: BoothId) -> Option<Coordinates> {
        layout.iter().find(|(b, _)| *b == id).map(|(_, c)| *c)
    }

    #[test]
    fn default_grid_has_ten_columns() {
        assert_eq!(LayoutGrid::default().columns(), 10);
    }

    #[test]
    fn narrow_canvas_still_has_one_column() {
        let grid = LayoutGrid {
            canvas_width: 10.0,
            ..LayoutGrid::default()
        };
        assert_eq!(grid.columns(), 1);
    }

    #[test]
    fn booths_are_sorted_by_hall_event_and_number() {
        let b2 = booth("A-2", "Expo", "Hall 1");
        let b1 = booth("a-1", "Expo", "Hall 1");
        let c1 = booth("C-1", "Expo", "hall 2");

        let layout = auto_layout([&c1, &b2, &b1]);

        assert_eq!(
            position_of(&layout, b1.id),
            Some(Coordinates { x: 40.0, y: 40.0 })
        );
        assert_eq!(
            position_of(&layout, b2.id),
            Some(Coordinates { x: 130.0, y: 40.0 })
        );
        // Third slot overall, second hall
        assert_eq!(
            position_of(&layout, c1.id),
            Some(Coordinates { x: 220.0, y: 190.0 })
        );
    }

    #[test]
    fn empty_hall_is_laid_out_first_as_default_hall() {
        let lobby = booth("L-1", "Expo", "");
        let hall = booth("H-1", "Expo", "Hall A");

        let layout = auto_layout([&hall, &lobby]);

        assert_eq!(
            position_of(&layout, lobby.id),
            Some(Coordinates { x: 40.0, y: 40.0 })
        );
        assert_eq!(
            position_of(&layout, hall.id),
            Some(Coordinates { x: 130.0, y: 190.0 })
        );
    }

    #[test]
    fn positioned_booths_are_skipped() {
        let mut placed = booth("A-1", "Expo", "Hall 1");
        placed.coordinates = Some(Coordinates { x: 500.0, y: 300.0 });
        let fresh = booth("A-2", "Expo", "Hall 1");

        let layout = auto_layout([&placed, &fresh]);

        assert_eq!(layout.len(), 1);
        assert_eq!(
            position_of(&layout, fresh.id),
            Some(Coordinates { x: 40.0, y: 40.0 })
        );
    }

    #[test]
    fn eleventh_booth_wraps_to_second_row() {
        let booths: Vec<Booth> = (0..11)
            .map(|i| booth(&format!("B-{i:02}"), "Expo", "Hall 1"))
            .collect();

        let layout = auto_layout(&booths);

        assert_eq!(
            position_of(&layout, booths[10].id),
            Some(Coordinates { x: 40.0, y: 110.0 })
        );
    }

    proptest! {
        #[test]
        fn every_unplaced_booth_gets_a_distinct_slot(
            specs in prop::collection::vec(("[A-C]-[0-9]{1,2}", "[a-b]{0,1}"), 0..40)
        ) {
            let booths: Vec<Booth> = specs
                .iter()
                .map(|(number, hall)| booth(number, "Expo", hall))
                .collect();

            let layout = auto_layout(&booths);
            prop_assert_eq!(layout.len(), booths.len());

            let grid = LayoutGrid::default();
            for (_, c) in &layout {
                prop_assert!(c.x >= grid.padding);
                prop_assert!(c.x + grid.booth_width <= grid.canvas_width);
                prop_assert!(c.y >= grid.padding);
            }

            for (i, (_, a)) in layout.iter().enumerate() {
                for (_, b) in layout.iter().skip(i + 1) {
                    prop_assert!(a != b);
                }
            }
        }

        #[test]
        fn layout_is_independent_of_input_order(
            numbers in prop::collection::hash_set("[A-Z]-[0-9]{1,3}", 1..25)
        ) {
            let booths: Vec<Booth> = numbers.iter().map(|n| booth(n, "Expo", "Hall 1")).collect();
            let reversed: Vec<&Booth> = booths.iter().rev().collect();

            let mut forward = auto_layout(&booths);
            let mut backward = auto_layout(reversed);
            forward.sort_by_key(|(id, _)| *id);
            backward.sort_by_key(|(id, _)| *id);

            prop_assert_eq!(forward, backward);
        }
    }
}
