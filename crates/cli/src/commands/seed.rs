//! Demo data for local development and demonstrations.
//!
//! Creates help requests owned by `demo@neighbourly.app`, spread around UK
//! cities, so the browse and claim flows have something to show.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use tracing::info;

use neighbourly_core::{
    ClaimPolicy, Clock, Email, Location, NewHelpRequest, RequestItem, SystemClock,
};
use neighbourly_server::db::{self, AccountStore, PgStore};
use neighbourly_server::services::LifecycleService;

use super::{CommandError, database_url};

/// Owner of every demo request.
pub const DEMO_EMAIL: &str = "demo@neighbourly.app";

/// City name with its centre as (lat, lng) in ten-thousandths of a degree.
const UK_CITIES: &[(&str, i64, i64)] = &[
    ("London", 515_074, -1_278),
    ("Manchester", 534_808, -22_426),
    ("Birmingham", 524_862, -18_904),
    ("Leeds", 538_008, -15_491),
    ("Glasgow", 558_642, -42_518),
    ("Liverpool", 534_084, -29_916),
    ("Newcastle", 549_783, -16_178),
    ("Sheffield", 533_811, -14_701),
    ("Bristol", 514_545, -25_879),
    ("Edinburgh", 559_533, -31_883),
    ("Cardiff", 514_816, -31_791),
    ("Belfast", 545_973, -59_301),
    ("Nottingham", 529_548, -11_581),
    ("Southampton", 509_097, -14_044),
    ("Oxford", 517_520, -12_577),
    ("Cambridge", 522_053, 1_218),
    ("Brighton", 508_225, -1_372),
    ("Plymouth", 503_755, -41_427),
    ("Leicester", 526_369, -11_398),
    ("Coventry", 524_068, -15_197),
    ("York", 539_591, -10_815),
    ("Aberdeen", 571_497, -20_943),
    ("Dundee", 564_620, -29_707),
    ("Swansea", 516_214, -39_436),
    ("Reading", 514_543, -9_781),
    ("Derby", 529_225, -14_746),
    ("Exeter", 507_184, -35_339),
    ("Norwich", 526_309, 12_974),
    ("Milton Keynes", 520_406, -7_594),
    ("Bournemouth", 507_192, -18_808),
];

/// Largest coordinate offset from a city centre, in ten-thousandths (~5 km).
const JITTER: i64 = 500;

const STREET_NAMES: &[&str] = &[
    "High", "Church", "Station", "Park", "Victoria", "Queen", "King", "Mill", "Green", "North",
    "South", "West", "East", "Oak", "Elm", "Maple", "Cedar", "Pine", "Willow", "Rose",
];

const STREET_TYPES: &[&str] = &[
    "Street", "Road", "Lane", "Avenue", "Drive", "Close", "Way", "Place", "Crescent", "Gardens",
];

const FOOD: &[&str] = &[
    "Bread", "Milk", "Eggs", "Butter", "Cheese", "Rice", "Pasta", "Tinned beans", "Tinned soup",
    "Cereal", "Tea bags", "Coffee", "Sugar", "Flour", "Cooking oil", "Tinned tomatoes",
    "Potatoes", "Onions", "Carrots", "Apples", "Bananas", "Orange juice", "Biscuits", "Jam",
    "Peanut butter", "Honey", "Frozen peas",
];

const ESSENTIALS: &[&str] = &[
    "Toiletries", "Shampoo", "Soap", "Toothpaste", "Toothbrush", "Toilet roll", "Tissues",
    "Nappies", "Baby wipes", "Sanitary products", "Deodorant", "Washing up liquid",
    "Laundry detergent", "Bin bags", "Light bulbs", "Batteries", "Blankets", "Towels",
];

const CLOTHING: &[&str] = &[
    "Warm coat", "Jumper", "Hoodie", "T-shirts", "Jeans", "Socks", "Gloves", "Scarf",
    "Beanie hat", "Trainers", "Boots", "Pyjamas", "Raincoat",
];

/// Item categories with their relative weights (food 5 : essentials 3 : clothing 2).
const CATEGORIES: &[(&[&str], u32)] = &[(FOOD, 5), (ESSENTIALS, 3), (CLOTHING, 2)];

const MESSAGES: &[&str] = &[
    "Struggling a bit this month and would really appreciate help with these items. Thank you!",
    "Single parent here and things are tight right now. Any help would be amazing.",
    "Just moved to the area and could use a hand getting settled. Grateful for any support!",
    "Recovering from illness and can't get out easily. Would really appreciate the help.",
    "Caring for my elderly mum and we're running low on supplies. Any help is wonderful!",
    "Just lost my job and trying to make ends meet. Anything you can spare would mean a lot.",
    "Student here, budget is stretched thin. Would be so grateful for help with the basics!",
    "Hello neighbour! Could really use a hand this week. Happy to pay it forward when I can.",
    "Family of four, hit an unexpected expense. Help with groceries would be a lifesaver!",
    "First time asking for help, bit nervous but grateful this community exists!",
];

/// Build one random demo request with a pickup date after `today`.
///
/// # Errors
///
/// Returns `CommandError::DemoData` if the generated values fail validation.
pub fn demo_request(rng: &mut impl Rng, today: NaiveDate) -> Result<NewHelpRequest, CommandError> {
    let &(city, lat, lng) = pick(rng, UK_CITIES)?;
    let location = Location::new(
        Decimal::new(lat + rng.random_range(-JITTER..=JITTER), 4),
        Decimal::new(lng + rng.random_range(-JITTER..=JITTER), 4),
    )
    .map_err(|e| CommandError::DemoData(e.to_string()))?;

    let address = format!(
        "{} {} {}, {city}",
        rng.random_range(1..=150),
        pick(rng, STREET_NAMES)?,
        pick(rng, STREET_TYPES)?,
    );

    let pickup_time = format!(
        "{:02}{:02}",
        rng.random_range(8..=20),
        pick(rng, &[0, 15, 30, 45])?,
    );
    let pickup_date = today.checked_add_days(Days::new(rng.random_range(1..=60)));

    NewHelpRequest::new(
        (*pick(rng, MESSAGES)?).to_owned(),
        location,
        address,
        pickup_time,
        pickup_date,
        demo_items(rng)?,
    )
    .map_err(|e| CommandError::DemoData(e.to_string()))
}

/// One to five distinct items drawn from the weighted categories.
fn demo_items(rng: &mut impl Rng) -> Result<Vec<RequestItem>, CommandError> {
    let wanted = rng.random_range(1..=5);
    let mut seen = HashSet::new();
    let mut items = Vec::with_capacity(wanted);

    while items.len() < wanted {
        let (category, _) = CATEGORIES
            .choose_weighted(rng, |(_, weight)| *weight)
            .map_err(|e| CommandError::DemoData(e.to_string()))?;
        let name = *pick(rng, category)?;
        if seen.insert(name) {
            items.push(RequestItem {
                name: name.to_owned(),
                quantity: rng.random_range(1..=4),
            });
        }
    }

    Ok(items)
}

fn pick<'a, T>(rng: &mut impl Rng, values: &'a [T]) -> Result<&'a T, CommandError> {
    values
        .choose(rng)
        .ok_or_else(|| CommandError::DemoData("empty sample table".to_string()))
}

/// Create `count` demo requests.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn demo(count: usize) -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    let store = PgStore::new(pool);

    let email = Email::parse(DEMO_EMAIL).map_err(|e| CommandError::DemoData(e.to_string()))?;
    let owner = store.find_or_create_account(&email).await?;
    info!(account_id = %owner.id, "Demo account ready");

    let clock = SystemClock;
    let lifecycle = LifecycleService::new(&store, &clock, ClaimPolicy::default());
    let today = clock.today();
    let mut rng = rand::rng();

    for created in 1..=count {
        let request = demo_request(&mut rng, today)?;
        lifecycle.create(owner.id, &request).await?;
        if created % 25 == 0 {
            info!("Created {created}/{count} requests");
        }
    }

    info!("Seeding complete! Created {count} demo requests");
    Ok(())
}
