use indexmap::IndexMap;

use crate::individual::PersonId;

/// Immutable household directory: household id to its ordered members.
///
/// Built once at construction by partitioning the population into
/// fixed-size chunks of `mean_household_size` (the last household takes the
/// remainder). Household quarantine walks these member lists.
pub struct HouseholdDirectory {
    members: IndexMap<usize, Vec<PersonId>>,
}

impl HouseholdDirectory {
    /// Partition `n_total` people into households, returning each person's
    /// household number alongside the directory.
    #[must_use]
    pub fn assign(n_total: usize, mean_household_size: usize) -> (Vec<usize>, Self) {
        let size = mean_household_size.max(1);
        let mut members = IndexMap::new();
        let mut house_of = vec![0; n_total];
        let mut house = 0;
        let mut next_person = 0;
        while next_person < n_total {
            let take = size.min(n_total - next_person);
            let list: Vec<PersonId> = (next_person..next_person + take).collect();
            for &person in &list {
                house_of[person] = house;
            }
            members.insert(house, list);
            next_person += take;
            house += 1;
        }
        (house_of, Self { members })
    }

    #[must_use]
    pub fn members(&self, house: usize) -> &[PersonId] {
        self.members.get(&house).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn n_households(&self) -> usize {
        self.members.len()
    }
}
