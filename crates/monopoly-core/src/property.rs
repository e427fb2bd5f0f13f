//! Property ownership, rent, mortgages and buildings.
//!
//! The registry is the only owner of property records and the single source
//! of truth for who owns what. Build levels follow the even-building rule: a
//! property may be raised only from the group minimum and lowered only from
//! the group maximum, and only while its owner holds the whole group.

use crate::board::{ColorGroup, PlayerId, Position, PropertyId, PropertySpec};
use crate::ledger::{Ledger, LedgerError, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest build level (hotel)
pub const MAX_BUILD_LEVEL: u8 = 5;

/// Extra percentage charged on top of the mortgage value to redeem
pub const DEFAULT_REDEEM_INTEREST: u32 = 10;

/// Errors from property operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PropertyError {
    #[error("No such property: {0}")]
    UnknownProperty(PropertyId),

    #[error("Property is not owned")]
    Unowned,

    #[error("Property is already owned")]
    AlreadyOwned,

    #[error("Player {0} does not own this property")]
    NotOwner(PlayerId),

    #[error("Property is mortgaged")]
    Mortgaged,

    #[error("Property is not mortgaged")]
    NotMortgaged,

    #[error("Property has buildings")]
    HasBuildings,

    #[error("No buildings to sell")]
    NoBuildings,

    #[error("Owner does not hold the whole color group")]
    NotMonopoly,

    #[error("Building must stay even across the color group")]
    UnevenBuilding,

    #[error("Property is already at hotel level")]
    MaxLevel,

    #[error("This group cannot be built on")]
    NotBuildable,

    #[error(transparent)]
    Funds(#[from] LedgerError),
}

/// An ownable board position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub position: Position,
    pub price: Money,
    pub group: ColorGroup,
    pub owner: Option<PlayerId>,
    /// 0 = bare, 1-4 = houses, 5 = hotel
    pub build_level: u8,
    pub mortgaged: bool,
    pub rent_schedule: [Money; 6],
    pub house_cost: Money,
}

impl Property {
    pub fn from_spec(id: PropertyId, position: Position, spec: &PropertySpec) -> Self {
        Self {
            id,
            name: spec.name.clone(),
            position,
            price: spec.price,
            group: spec.group,
            owner: None,
            build_level: 0,
            mortgaged: false,
            rent_schedule: spec.rent,
            house_cost: spec.house_cost,
        }
    }

    /// Cash received when mortgaging
    pub fn mortgage_value(&self) -> Money {
        self.price / 2
    }

    /// Cost of lifting the mortgage: mortgage value plus `interest` percent
    pub fn redeem_cost(&self, interest: u32) -> Money {
        let cost = u64::from(self.mortgage_value()) * (100 + u64::from(interest)) / 100;
        Money::try_from(cost).unwrap_or(Money::MAX)
    }

    /// Refund for selling one building
    pub fn building_refund(&self) -> Money {
        self.house_cost / 2
    }
}

/// All property records on the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRegistry {
    properties: Vec<Property>,
    redeem_interest: u32,
}

impl PropertyRegistry {
    pub fn new(properties: Vec<Property>) -> Self {
        Self {
            properties,
            redeem_interest: DEFAULT_REDEEM_INTEREST,
        }
    }

    /// Override the mortgage redemption interest (percent)
    pub fn with_redeem_interest(mut self, interest: u32) -> Self {
        self.redeem_interest = interest;
        self
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Current owner of a property
    pub fn owner_of(&self, id: PropertyId) -> Option<PlayerId> {
        self.get(id).and_then(|p| p.owner)
    }

    /// Properties owned by a player, in board order
    pub fn owned_by(&self, owner: PlayerId) -> Vec<PropertyId> {
        self.properties
            .iter()
            .filter(|p| p.owner == Some(owner))
            .map(|p| p.id)
            .collect()
    }

    /// Members of a color group
    pub fn group(&self, group: ColorGroup) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(move |p| p.group == group)
    }

    /// Whether `owner` holds every property of the group
    pub fn has_monopoly(&self, owner: PlayerId, group: ColorGroup) -> bool {
        let mut members = self.group(group).peekable();
        members.peek().is_some() && members.all(|p| p.owner == Some(owner))
    }

    /// Rent due when landing on a property
    pub fn calculate_rent(&self, id: PropertyId) -> Money {
        match self.get(id) {
            Some(p) if !p.mortgaged && p.owner.is_some() => {
                p.rent_schedule[p.build_level.min(MAX_BUILD_LEVEL) as usize]
            }
            _ => 0,
        }
    }

    /// Cost of redeeming a property's mortgage
    pub fn redeem_cost(&self, id: PropertyId) -> Option<Money> {
        self.get(id).map(|p| p.redeem_cost(self.redeem_interest))
    }

    /// Why the next building step on a property is not allowed, if it isn't
    pub fn check_build(&self, id: PropertyId) -> Result<(), PropertyError> {
        let prop = self.get(id).ok_or(PropertyError::UnknownProperty(id))?;
        let owner = prop.owner.ok_or(PropertyError::Unowned)?;

        if !prop.group.is_buildable() {
            return Err(PropertyError::NotBuildable);
        }
        if prop.mortgaged {
            return Err(PropertyError::Mortgaged);
        }
        if !self.has_monopoly(owner, prop.group) {
            return Err(PropertyError::NotMonopoly);
        }
        if prop.build_level >= MAX_BUILD_LEVEL {
            return Err(PropertyError::MaxLevel);
        }
        let min = self.group(prop.group).map(|p| p.build_level).min();
        if min != Some(prop.build_level) {
            return Err(PropertyError::UnevenBuilding);
        }
        Ok(())
    }

    pub fn can_build(&self, id: PropertyId) -> bool {
        self.check_build(id).is_ok()
    }

    /// Why a building cannot be sold from a property, if it can't
    pub fn check_sell_building(&self, id: PropertyId) -> Result<(), PropertyError> {
        let prop = self.get(id).ok_or(PropertyError::UnknownProperty(id))?;
        prop.owner.ok_or(PropertyError::Unowned)?;

        if prop.mortgaged {
            return Err(PropertyError::Mortgaged);
        }
        if prop.build_level == 0 {
            return Err(PropertyError::NoBuildings);
        }
        let max = self.group(prop.group).map(|p| p.build_level).max();
        if max != Some(prop.build_level) {
            return Err(PropertyError::UnevenBuilding);
        }
        Ok(())
    }

    pub fn can_sell_building(&self, id: PropertyId) -> bool {
        self.check_sell_building(id).is_ok()
    }

    /// Why a property cannot be mortgaged, if it can't
    pub fn check_mortgage(&self, id: PropertyId) -> Result<(), PropertyError> {
        let prop = self.get(id).ok_or(PropertyError::UnknownProperty(id))?;
        prop.owner.ok_or(PropertyError::Unowned)?;
        if prop.mortgaged {
            return Err(PropertyError::Mortgaged);
        }
        if prop.build_level > 0 {
            return Err(PropertyError::HasBuildings);
        }
        Ok(())
    }

    /// Assign an unowned property to a buyer. Payment is the caller's job.
    pub fn assign(&mut self, id: PropertyId, owner: PlayerId) -> Result<(), PropertyError> {
        let prop = self.get_mut(id)?;
        if prop.owner.is_some() {
            return Err(PropertyError::AlreadyOwned);
        }
        prop.owner = Some(owner);
        Ok(())
    }

    /// Hand an owned property to another player, keeping its mortgage state
    pub(crate) fn reassign(&mut self, id: PropertyId, owner: PlayerId) -> Result<(), PropertyError> {
        let prop = self.get_mut(id)?;
        prop.owner.ok_or(PropertyError::Unowned)?;
        prop.owner = Some(owner);
        Ok(())
    }

    /// Mortgage a property, crediting half its price to the owner
    pub fn mortgage(&mut self, id: PropertyId, ledger: &mut Ledger) -> Result<Money, PropertyError> {
        self.check_mortgage(id)?;
        let prop = self.get_mut(id)?;
        let owner = prop.owner.ok_or(PropertyError::Unowned)?;
        let value = prop.mortgage_value();
        let reason = format!("Mortgage {}", prop.name);

        ledger.credit(owner, value, &reason)?;
        prop.mortgaged = true;
        Ok(value)
    }

    /// Lift a mortgage; on insufficient funds nothing changes
    pub fn redeem_mortgage(
        &mut self,
        id: PropertyId,
        ledger: &mut Ledger,
    ) -> Result<Money, PropertyError> {
        let interest = self.redeem_interest;
        let prop = self.get_mut(id)?;
        let owner = prop.owner.ok_or(PropertyError::Unowned)?;
        if !prop.mortgaged {
            return Err(PropertyError::NotMortgaged);
        }
        let cost = prop.redeem_cost(interest);
        let reason = format!("Redeem {}", prop.name);

        ledger.debit(owner, cost, &reason)?;
        prop.mortgaged = false;
        Ok(cost)
    }

    /// Pay for and add one building level
    pub fn build(&mut self, id: PropertyId, ledger: &mut Ledger) -> Result<u8, PropertyError> {
        self.check_build(id)?;
        let prop = self.get_mut(id)?;
        let owner = prop.owner.ok_or(PropertyError::Unowned)?;
        let reason = format!("Build on {}", prop.name);

        ledger.debit(owner, prop.house_cost, &reason)?;
        prop.build_level += 1;
        Ok(prop.build_level)
    }

    /// Remove one building level for half the house cost
    pub fn sell_building(&mut self, id: PropertyId, ledger: &mut Ledger) -> Result<u8, PropertyError> {
        self.check_sell_building(id)?;
        let prop = self.get_mut(id)?;
        let owner = prop.owner.ok_or(PropertyError::Unowned)?;
        let reason = format!("Sell building on {}", prop.name);

        ledger.credit(owner, prop.building_refund(), &reason)?;
        prop.build_level -= 1;
        Ok(prop.build_level)
    }

    /// Return every property of a bankrupt player to the bank, fully reset
    pub fn release_all(&mut self, owner: PlayerId) -> Vec<PropertyId> {
        let mut released = Vec::new();
        for prop in self.properties.iter_mut().filter(|p| p.owner == Some(owner)) {
            prop.owner = None;
            prop.mortgaged = false;
            prop.build_level = 0;
            released.push(prop.id);
        }
        released
    }

    fn get_mut(&mut self, id: PropertyId) -> Result<&mut Property, PropertyError> {
        self.properties
            .get_mut(id)
            .ok_or(PropertyError::UnknownProperty(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardConfig, CellSpec};
    use crate::ledger::DEFAULT_BANK_RESERVE;

    /// Brown group (ids 0, 1) and a railroad (id 2)
    fn registry() -> PropertyRegistry {
        BoardConfig::new(vec![
            CellSpec::start(),
            CellSpec::Property(PropertySpec::new(
                "Mediterranean",
                60,
                ColorGroup::Brown,
                [2, 10, 30, 90, 160, 250],
                50,
            )),
            CellSpec::Property(PropertySpec::new(
                "Baltic",
                60,
                ColorGroup::Brown,
                [4, 20, 60, 180, 320, 450],
                50,
            )),
            CellSpec::Property(PropertySpec::flat("Reading", 200, ColorGroup::Railroad, 25)),
            CellSpec::jail(),
        ])
        .build()
        .unwrap()
        .1
    }

    fn ledger() -> Ledger {
        Ledger::new(2, 1500, DEFAULT_BANK_RESERVE)
    }

    fn monopoly(registry: &mut PropertyRegistry, owner: PlayerId) {
        registry.assign(0, owner).unwrap();
        registry.assign(1, owner).unwrap();
    }

    #[test]
    fn test_monopoly_detection() {
        let mut reg = registry();
        assert!(!reg.has_monopoly(0, ColorGroup::Brown));

        reg.assign(0, 0).unwrap();
        assert!(!reg.has_monopoly(0, ColorGroup::Brown));

        reg.assign(1, 0).unwrap();
        assert!(reg.has_monopoly(0, ColorGroup::Brown));
        assert!(!reg.has_monopoly(1, ColorGroup::Brown));

        // Losing one member breaks it
        reg.reassign(1, 1).unwrap();
        assert!(!reg.has_monopoly(0, ColorGroup::Brown));
    }

    #[test]
    fn test_no_monopoly_on_missing_group() {
        let reg = registry();
        assert!(!reg.has_monopoly(0, ColorGroup::DarkBlue));
    }

    #[test]
    fn test_rent_follows_schedule() {
        let mut reg = registry();
        let mut ledger = ledger();
        assert_eq!(reg.calculate_rent(0), 0);

        monopoly(&mut reg, 0);
        assert_eq!(reg.calculate_rent(0), 2);

        reg.build(0, &mut ledger).unwrap();
        assert_eq!(reg.calculate_rent(0), 10);
        assert_eq!(ledger.balance(0), 1450);
    }

    #[test]
    fn test_mortgaged_rent_is_zero_at_every_level() {
        let mut reg = registry();
        monopoly(&mut reg, 0);
        for level in 0..=MAX_BUILD_LEVEL {
            reg.properties[0].build_level = level;
            reg.properties[0].mortgaged = true;
            assert_eq!(reg.calculate_rent(0), 0, "level {}", level);
        }
    }

    #[test]
    fn test_even_building_rule() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);

        reg.build(0, &mut ledger).unwrap();
        assert_eq!(reg.check_build(0), Err(PropertyError::UnevenBuilding));
        assert!(reg.can_build(1));

        reg.build(1, &mut ledger).unwrap();
        assert!(reg.can_build(0));

        // Selling must start from the group maximum
        reg.build(0, &mut ledger).unwrap();
        assert_eq!(reg.check_sell_building(1), Err(PropertyError::UnevenBuilding));
        assert!(reg.can_sell_building(0));
    }

    #[test]
    fn test_build_requires_monopoly() {
        let mut reg = registry();
        let mut ledger = ledger();
        reg.assign(0, 0).unwrap();
        reg.assign(1, 1).unwrap();

        assert_eq!(reg.build(0, &mut ledger), Err(PropertyError::NotMonopoly));
        assert_eq!(ledger.balance(0), 1500);
    }

    #[test]
    fn test_build_stops_at_hotel() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);
        for _ in 0..MAX_BUILD_LEVEL {
            reg.build(0, &mut ledger).unwrap();
            reg.build(1, &mut ledger).unwrap();
        }
        assert_eq!(reg.get(0).unwrap().build_level, 5);
        assert_eq!(reg.check_build(0), Err(PropertyError::MaxLevel));
        assert_eq!(reg.calculate_rent(1), 450);
    }

    #[test]
    fn test_railroads_are_not_buildable() {
        let mut reg = registry();
        reg.assign(2, 0).unwrap();
        assert!(reg.has_monopoly(0, ColorGroup::Railroad));
        assert_eq!(reg.check_build(2), Err(PropertyError::NotBuildable));
    }

    #[test]
    fn test_build_without_funds_changes_nothing() {
        let mut reg = registry();
        let mut ledger = Ledger::new(1, 20, DEFAULT_BANK_RESERVE);
        monopoly(&mut reg, 0);

        let err = reg.build(0, &mut ledger).unwrap_err();
        assert!(matches!(err, PropertyError::Funds(LedgerError::InsufficientFunds { .. })));
        assert_eq!(reg.get(0).unwrap().build_level, 0);
    }

    #[test]
    fn test_sell_building_refunds_half() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);
        reg.build(0, &mut ledger).unwrap();

        assert_eq!(reg.sell_building(0, &mut ledger), Ok(0));
        assert_eq!(ledger.balance(0), 1500 - 50 + 25);
        assert_eq!(reg.check_sell_building(0), Err(PropertyError::NoBuildings));
    }

    #[test]
    fn test_mortgage_and_redeem() {
        let mut reg = registry();
        let mut ledger = ledger();
        reg.assign(0, 0).unwrap();

        assert_eq!(reg.mortgage(0, &mut ledger), Ok(30));
        assert_eq!(ledger.balance(0), 1530);
        assert_eq!(reg.mortgage(0, &mut ledger), Err(PropertyError::Mortgaged));

        assert_eq!(reg.redeem_cost(0), Some(33));
        assert_eq!(reg.redeem_mortgage(0, &mut ledger), Ok(33));
        assert_eq!(ledger.balance(0), 1497);
        assert!(!reg.get(0).unwrap().mortgaged);
        assert_eq!(reg.redeem_mortgage(0, &mut ledger), Err(PropertyError::NotMortgaged));
    }

    #[test]
    fn test_redeem_cost_of_expensive_property() {
        let spec = PropertySpec::new(
            "Mayfair Tower",
            100_000_000,
            ColorGroup::DarkBlue,
            [50, 200, 600, 1400, 1700, 2000],
            200,
        );
        let prop = Property::from_spec(0, 1, &spec);
        assert_eq!(prop.redeem_cost(10), 55_000_000);

        let spec = PropertySpec::new(
            "Bank Vault",
            Money::MAX,
            ColorGroup::DarkBlue,
            [50, 200, 600, 1400, 1700, 2000],
            200,
        );
        assert_eq!(Property::from_spec(0, 1, &spec).redeem_cost(u32::MAX), Money::MAX);
    }

    #[test]
    fn test_mortgage_blocks_building() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);
        reg.mortgage(1, &mut ledger).unwrap();

        assert_eq!(reg.check_build(1), Err(PropertyError::Mortgaged));
    }

    #[test]
    fn test_cannot_mortgage_built_property() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);
        reg.build(0, &mut ledger).unwrap();
        assert_eq!(reg.mortgage(0, &mut ledger), Err(PropertyError::HasBuildings));
    }

    #[test]
    fn test_redeem_without_funds_keeps_mortgage() {
        let mut reg = registry();
        let mut ledger = Ledger::new(1, 0, DEFAULT_BANK_RESERVE);
        reg.assign(0, 0).unwrap();
        reg.mortgage(0, &mut ledger).unwrap();
        ledger.debit(0, 30, "spent").unwrap();

        assert!(reg.redeem_mortgage(0, &mut ledger).is_err());
        assert!(reg.get(0).unwrap().mortgaged);
    }

    #[test]
    fn test_release_all_resets_everything() {
        let mut reg = registry();
        let mut ledger = ledger();
        monopoly(&mut reg, 0);
        reg.assign(2, 1).unwrap();
        reg.mortgage(1, &mut ledger).unwrap();
        reg.build(0, &mut ledger).unwrap();

        let released = reg.release_all(0);
        assert_eq!(released, vec![0, 1]);
        for id in released {
            let p = reg.get(id).unwrap();
            assert_eq!(p.owner, None);
            assert_eq!(p.build_level, 0);
            assert!(!p.mortgaged);
        }
        assert_eq!(reg.owner_of(2), Some(1));
    }
}
