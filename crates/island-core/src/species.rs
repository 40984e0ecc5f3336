//! Species vocabulary and per-species profiles.
//!
//! Every animal shares one behavior implementation. What differs between a
//! wolf and a rabbit is captured here as data: a [`SpeciesProfile`] with the
//! numeric constants plus a [`FeedingStrategy`] selecting which of the three
//! feeding shapes applies.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed set of species that can live on the island
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    Wolf,
    Boa,
    Fox,
    Bear,
    Eagle,
    Horse,
    Deer,
    Rabbit,
    Mouse,
    Goat,
    Sheep,
    Boar,
    Buffalo,
    Duck,
    Caterpillar,
}

impl Species {
    pub fn all() -> [Species; 15] {
        [
            Species::Wolf,
            Species::Boa,
            Species::Fox,
            Species::Bear,
            Species::Eagle,
            Species::Horse,
            Species::Deer,
            Species::Rabbit,
            Species::Mouse,
            Species::Goat,
            Species::Sheep,
            Species::Boar,
            Species::Buffalo,
            Species::Duck,
            Species::Caterpillar,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Species::Wolf => "Wolf",
            Species::Boa => "Boa",
            Species::Fox => "Fox",
            Species::Bear => "Bear",
            Species::Eagle => "Eagle",
            Species::Horse => "Horse",
            Species::Deer => "Deer",
            Species::Rabbit => "Rabbit",
            Species::Mouse => "Mouse",
            Species::Goat => "Goat",
            Species::Sheep => "Sheep",
            Species::Boar => "Boar",
            Species::Buffalo => "Buffalo",
            Species::Duck => "Duck",
            Species::Caterpillar => "Caterpillar",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Species::all()
            .into_iter()
            .find(|species| species.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownSpecies(s.to_string()))
    }
}

/// Which of the three feeding shapes a species uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedingStrategy {
    /// Grazes the plant in its cell
    Herbivore,
    /// Hunts any other species in its cell that appears in its diet
    Carnivore,
    /// Grazes first, then hunts only the listed prey if still hungry
    Omnivore { prey: Vec<Species> },
}

/// Success probabilities for each food source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diet {
    /// Probability of a successful graze, if the species eats plants at all
    #[serde(default)]
    pub plant: Option<f64>,
    /// Probability of a successful catch per prey species
    #[serde(default)]
    pub prey: BTreeMap<Species, f64>,
}

impl Diet {
    pub fn plants(probability: f64) -> Self {
        Self {
            plant: Some(probability),
            prey: BTreeMap::new(),
        }
    }

    pub fn with_prey(mut self, species: Species, probability: f64) -> Self {
        self.prey.insert(species, probability);
        self
    }

    pub fn plant_probability(&self) -> f64 {
        self.plant.unwrap_or(0.0)
    }

    /// Catch probability for `species`; 0 when it is not on the menu.
    pub fn probability_for(&self, species: Species) -> f64 {
        self.prey.get(&species).copied().unwrap_or(0.0)
    }

    fn probabilities(&self) -> impl Iterator<Item = f64> + '_ {
        self.plant.iter().copied().chain(self.prey.values().copied())
    }
}

/// Static per-species constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesProfile {
    /// Glyph used in snapshots
    pub glyph: String,
    /// Body weight in kg
    pub weight: f64,
    /// Fixed jump length in cells per move
    pub speed: i32,
    /// Food needed to be fully sated
    pub needed_food: f64,
    /// Hunger level at which the animal starves
    pub max_hunger: f64,
    /// Maximum number of this species sharing one cell
    pub capacity: usize,
    /// Offspring per litter
    pub litter_size: u32,
    pub feeding: FeedingStrategy,
    pub diet: Diet,
}

impl SpeciesProfile {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        glyph: &str,
        weight: f64,
        speed: i32,
        needed_food: f64,
        capacity: usize,
        litter_size: u32,
        feeding: FeedingStrategy,
        diet: Diet,
    ) -> Self {
        Self {
            glyph: glyph.to_string(),
            weight,
            speed,
            needed_food,
            max_hunger: needed_food,
            capacity,
            litter_size,
            feeding,
            diet,
        }
    }

    pub fn validate(&self, species: Species) -> Result<()> {
        if self.speed < 0 {
            return Err(Error::InvalidConfig(format!(
                "{} has negative speed {}",
                species, self.speed
            )));
        }
        if self.needed_food < 0.0 || self.max_hunger < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "{} has negative food requirements",
                species
            )));
        }
        if let Some(p) = self.diet.probabilities().find(|p| !(0.0..=1.0).contains(p)) {
            return Err(Error::InvalidConfig(format!(
                "{} has diet probability {} outside [0, 1]",
                species, p
            )));
        }
        if let FeedingStrategy::Omnivore { prey } = &self.feeding {
            if prey.contains(&species) {
                return Err(Error::InvalidConfig(format!(
                    "{} lists itself as prey",
                    species
                )));
            }
        }
        Ok(())
    }
}

/// Profiles keyed by species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeciesTable(BTreeMap<Species, SpeciesProfile>);

impl SpeciesTable {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, species: Species, profile: SpeciesProfile) {
        self.0.insert(species, profile);
    }

    pub fn get(&self, species: Species) -> Result<&SpeciesProfile> {
        self.0.get(&species).ok_or(Error::MissingProfile(species))
    }

    pub fn get_mut(&mut self, species: Species) -> Result<&mut SpeciesProfile> {
        self.0.get_mut(&species).ok_or(Error::MissingProfile(species))
    }

    /// Per-cell cap for `species`; 0 when unconfigured, so nothing gets placed.
    pub fn capacity(&self, species: Species) -> usize {
        self.0.get(&species).map(|p| p.capacity).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, &SpeciesProfile)> + '_ {
        self.0.iter().map(|(species, profile)| (*species, profile))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        for (species, profile) in self.iter() {
            profile.validate(species)?;
        }
        Ok(())
    }
}

impl Default for SpeciesTable {
    fn default() -> Self {
        use FeedingStrategy::*;
        use Species::*;

        let wolf = Diet::default()
            .with_prey(Horse, 0.1)
            .with_prey(Deer, 0.15)
            .with_prey(Rabbit, 0.6)
            .with_prey(Mouse, 0.8)
            .with_prey(Goat, 0.6)
            .with_prey(Sheep, 0.7)
            .with_prey(Boar, 0.15)
            .with_prey(Buffalo, 0.1)
            .with_prey(Duck, 0.4);
        let boa = Diet::default()
            .with_prey(Fox, 0.15)
            .with_prey(Rabbit, 0.2)
            .with_prey(Mouse, 0.4)
            .with_prey(Duck, 0.1);
        let fox = Diet::default()
            .with_prey(Rabbit, 0.7)
            .with_prey(Mouse, 0.9)
            .with_prey(Duck, 0.6)
            .with_prey(Caterpillar, 0.4);
        let bear = Diet::default()
            .with_prey(Boa, 0.8)
            .with_prey(Horse, 0.4)
            .with_prey(Deer, 0.8)
            .with_prey(Rabbit, 0.8)
            .with_prey(Mouse, 0.9)
            .with_prey(Goat, 0.7)
            .with_prey(Sheep, 0.7)
            .with_prey(Boar, 0.5)
            .with_prey(Buffalo, 0.2)
            .with_prey(Duck, 0.1);
        let eagle = Diet::default()
            .with_prey(Fox, 0.1)
            .with_prey(Rabbit, 0.9)
            .with_prey(Mouse, 0.9)
            .with_prey(Duck, 0.8);
        let plants = Diet::plants(1.0);
        let mouse = Diet::plants(1.0).with_prey(Caterpillar, 0.9);
        let boar = Diet::plants(1.0)
            .with_prey(Mouse, 0.5)
            .with_prey(Caterpillar, 0.9);
        let duck = Diet::plants(1.0).with_prey(Caterpillar, 0.9);

        let mut table = Self::empty();

        table.insert(
            Wolf,
            SpeciesProfile::new("🐺", 50.0, 3, 8.0, 2, 3, Carnivore, wolf),
        );
        table.insert(
            Boa,
            SpeciesProfile::new("🐍", 15.0, 1, 3.0, 2, 2, Carnivore, boa),
        );
        table.insert(
            Fox,
            SpeciesProfile::new("🦊", 8.0, 2, 2.0, 2, 3, Carnivore, fox),
        );
        table.insert(
            Bear,
            SpeciesProfile::new("🐻", 500.0, 2, 80.0, 2, 2, Carnivore, bear),
        );
        table.insert(
            Eagle,
            SpeciesProfile::new("🦅", 6.0, 3, 1.0, 2, 2, Carnivore, eagle),
        );

        table.insert(
            Horse,
            SpeciesProfile::new("🐎", 400.0, 4, 60.0, 2, 1, Herbivore, plants.clone()),
        );
        table.insert(
            Deer,
            SpeciesProfile::new("🦌", 300.0, 4, 50.0, 2, 1, Herbivore, plants.clone()),
        );
        table.insert(
            Rabbit,
            SpeciesProfile::new("🐇", 2.0, 2, 0.45, 3, 5, Herbivore, plants.clone()),
        );
        table.insert(
            Goat,
            SpeciesProfile::new("🐐", 60.0, 3, 10.0, 2, 2, Herbivore, plants.clone()),
        );
        table.insert(
            Sheep,
            SpeciesProfile::new("🐑", 70.0, 3, 15.0, 2, 2, Herbivore, plants.clone()),
        );
        table.insert(
            Buffalo,
            SpeciesProfile::new("🦬", 700.0, 3, 100.0, 2, 1, Herbivore, plants.clone()),
        );
        table.insert(
            Caterpillar,
            SpeciesProfile::new("🐛", 0.01, 0, 0.0, 3, 10, Herbivore, plants),
        );

        let mouse_prey = Omnivore {
            prey: vec![Caterpillar],
        };
        let boar_prey = Omnivore {
            prey: vec![Mouse, Caterpillar],
        };
        let duck_prey = Omnivore {
            prey: vec![Caterpillar],
        };
        table.insert(
            Mouse,
            SpeciesProfile::new("🐁", 0.05, 1, 0.01, 3, 6, mouse_prey, mouse),
        );
        table.insert(
            Boar,
            SpeciesProfile::new("🐗", 400.0, 2, 50.0, 2, 4, boar_prey, boar),
        );
        table.insert(
            Duck,
            SpeciesProfile::new("🦆", 1.0, 4, 0.15, 2, 4, duck_prey, duck),
        );

        table
    }
}
