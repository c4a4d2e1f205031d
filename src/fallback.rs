//! Local data that needs no network: curated events and media keyed by year,
//! plus the contextual period templates used when every strategy failed.

use crate::model::{
    EventKind, EventRecord, MediaKind, MediaRecord, SOURCE_CURATED, SOURCE_GENERATED,
};
use crate::text;

pub const CURATED_MEDIA_SOURCE: &str = "Curated media";

static CURATED_EVENTS: &[(i32, &str)] = &[
    (1903, "Wright brothers make the first powered, controlled airplane flights at Kitty Hawk, North Carolina."),
    (1914, "World War I begins after the assassination of Archduke Franz Ferdinand (Austria-Hungary)."),
    (1918, "End of World War I; the 1918 influenza pandemic spreads worldwide."),
    (1929, "Stock Market Crash triggers the Great Depression."),
    (1939, "World War II begins with Germany's invasion of Poland."),
    (1945, "World War II ends in Europe (May) and the Pacific (Sept); United Nations founded."),
    (1955, "Rosa Parks refuses to give up her bus seat, sparking the Montgomery Bus Boycott."),
    (1963, "Assassination of U.S. President John F. Kennedy in Dallas, Texas."),
    (1969, "Apollo 11: Neil Armstrong and Buzz Aldrin land on the Moon (\"one small step\")."),
    (1971, "Introduction of the microprocessor-based technologies expands computing possibilities."),
    (1989, "Fall of the Berlin Wall, a key step toward the end of the Cold War."),
    (1991, "Dissolution of the Soviet Union; many independent nations emerge."),
    (2001, "September 11 attacks in the United States; major global aftermath follows."),
    (2008, "Global financial crisis affects economies worldwide."),
    (2010, "Haiti earthquake causes widespread devastation and humanitarian crisis."),
    (2016, "Historic political and cultural events globally (Brexit referendum in UK)."),
    (2019, "First reports of novel coronavirus in Wuhan, China (SARS-CoV-2)."),
    (2020, "COVID-19 pandemic reshapes global society and economy."),
    (2021, "Global vaccination campaigns and pandemic recovery efforts begin."),
    (2022, "Major geopolitical shifts and continued post-pandemic adaptations."),
    (2023, "AI revolution accelerates with widespread adoption of large language models."),
    (2024, "Significant technological, political, and cultural developments worldwide."),
];

struct CuratedMedia {
    year: i32,
    kind: MediaKind,
    url: &'static str,
    alt: &'static str,
    fallback: Option<&'static str>,
    date: Option<&'static str>,
    title: Option<&'static str>,
    description: Option<&'static str>,
}

static CURATED_MEDIA: &[CuratedMedia] = &[
    CuratedMedia {
        year: 1903,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/0/02/Wright_first_flight_1903Dec17.jpg/800px-Wright_first_flight_1903Dec17.jpg",
        alt: "Wright Brothers first flight at Kitty Hawk (1903)",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
    CuratedMedia {
        year: 1912,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/f/fd/RMS_Titanic_3.jpg/800px-RMS_Titanic_3.jpg",
        alt: "RMS Titanic before its maiden voyage (1912)",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
    CuratedMedia {
        year: 1929,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/5/50/Crowd_outside_nyse.jpg/800px-Crowd_outside_nyse.jpg",
        alt: "Crowd outside NYSE during 1929 Stock Market Crash",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
    CuratedMedia {
        year: 1941,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/0/07/USS_Arizona_Pearl_Harbor.jpg/800px-USS_Arizona_Pearl_Harbor.jpg",
        alt: "USS Arizona during Pearl Harbor attack (1941)",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
    CuratedMedia {
        year: 1945,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/5/54/VJ_Day_in_Times_Square.jpg/800px-VJ_Day_in_Times_Square.jpg",
        alt: "V-J Day celebration in Times Square, New York (1945)",
        fallback: None,
        date: Some("August 15"),
        title: Some("V-J Day Celebration"),
        description: None,
    },
    CuratedMedia {
        year: 1955,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/c/c4/Rosaparks.jpg/600px-Rosaparks.jpg",
        alt: "Rosa Parks mugshot after her arrest (1955)",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
    CuratedMedia {
        year: 1961,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/0/0f/Yuri_Gagarin_%281961%29_-_Restoration.jpg/800px-Yuri_Gagarin_%281961%29_-_Restoration.jpg",
        alt: "Yuri Gagarin, first human in space (1961)",
        fallback: None,
        date: Some("April 12"),
        title: Some("First Human in Space"),
        description: None,
    },
    CuratedMedia {
        year: 1963,
        kind: MediaKind::Audio,
        url: "https://upload.wikimedia.org/wikipedia/commons/8/82/I_Have_a_Dream_speech_by_Martin_Luther_King.ogg",
        alt: "Martin Luther King Jr.: \"I Have a Dream\" speech excerpt",
        fallback: Some("https://commons.wikimedia.org/wiki/File:I_Have_a_Dream_speech_by_Martin_Luther_King.ogg"),
        date: Some("August 28"),
        title: Some("I Have a Dream Speech"),
        description: Some("Excerpt from Martin Luther King Jr.'s famous \"I Have a Dream\" speech delivered at the March on Washington."),
    },
    CuratedMedia {
        year: 1969,
        kind: MediaKind::Audio,
        url: "https://upload.wikimedia.org/wikipedia/commons/9/9c/Apollo_11_first_step.ogg",
        alt: "Neil Armstrong: \"That's one small step for man, one giant leap for mankind\"",
        fallback: Some("https://commons.wikimedia.org/wiki/File:Apollo_11_first_step.ogg"),
        date: Some("July 20"),
        title: Some("Apollo 11 Moon Landing"),
        description: Some("Historic audio recording of Neil Armstrong's first words on the Moon during the Apollo 11 mission."),
    },
    CuratedMedia {
        year: 1989,
        kind: MediaKind::Image,
        url: "https://upload.wikimedia.org/wikipedia/commons/thumb/8/86/TheFallOfTheBerlinWall1989.JPG/800px-TheFallOfTheBerlinWall1989.JPG",
        alt: "Fall of the Berlin Wall (1989)",
        fallback: None,
        date: None,
        title: None,
        description: None,
    },
];

pub fn curated_text(year: i32) -> Option<&'static str> {
    CURATED_EVENTS
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, t)| *t)
}

/// Every curated (year, text) pair, ascending by year.
pub fn curated_entries() -> impl Iterator<Item = (i32, &'static str)> {
    CURATED_EVENTS.iter().copied()
}

pub fn curated_media(year: i32) -> Option<MediaRecord> {
    let m = CURATED_MEDIA.iter().find(|m| m.year == year)?;
    Some(
        MediaRecord {
            kind: m.kind,
            url: m.url.to_string(),
            alt: Some(m.alt.to_string()),
            title: m.title.map(str::to_string),
            description: m.description.map(str::to_string),
            source: CURATED_MEDIA_SOURCE.to_string(),
            fallback: m.fallback.map(str::to_string),
        }
        .corrected(),
    )
}

fn curated_media_date(year: i32) -> Option<&'static str> {
    CURATED_MEDIA
        .iter()
        .find(|m| m.year == year)
        .and_then(|m| m.date)
}

/// Curated record with its curated media attached.
pub fn curated_event(year: i32) -> Option<EventRecord> {
    let text = curated_text(year)?;
    let media = curated_media(year);
    let name = media
        .as_ref()
        .and_then(|m| m.title.clone())
        .unwrap_or_else(|| text::extract_event_name(text));
    let mut rec = EventRecord::new(year, name, text, SOURCE_CURATED);
    rec.kind = EventKind::Event;
    rec.date = curated_media_date(year).map(str::to_string);
    rec.media = media;
    Some(rec)
}

pub struct PeriodRule {
    pub name: &'static str,
    pub applies: fn(i32) -> bool,
    pub render: fn(i32) -> String,
}

/// Narrow eras come before the broad ones they overlap, so every rule is
/// reachable; the first match wins.
pub static PERIOD_RULES: &[PeriodRule] = &[
    PeriodRule {
        name: "world_war_one",
        applies: |y| (1914..=1918).contains(&y),
        render: |y| format!("{y} was during World War I, a global conflict that transformed international relations and society."),
    },
    PeriodRule {
        name: "world_war_two",
        applies: |y| (1939..=1945).contains(&y),
        render: |y| format!("{y} was during World War II, the most devastating conflict in human history affecting every continent."),
    },
    PeriodRule {
        name: "great_depression",
        applies: |y| (1929..=1938).contains(&y),
        render: |y| format!("{y} was during the Great Depression era, marked by economic hardship and social upheaval worldwide."),
    },
    PeriodRule {
        name: "civil_rights_space_race",
        applies: |y| (1960..=1975).contains(&y),
        render: |y| format!("{y} was during the Civil Rights era and Space Race, a time of social change and scientific achievement."),
    },
    PeriodRule {
        name: "early_internet",
        applies: |y| (1990..=2000).contains(&y),
        render: |y| format!("{y} was during the end of the Cold War and rise of the internet, marking a new technological age."),
    },
    PeriodRule {
        name: "cold_war",
        applies: |y| (1947..=1991).contains(&y),
        render: |y| format!("{y} was during the Cold War period, characterized by ideological tensions between superpowers."),
    },
    PeriodRule {
        name: "post_9_11",
        applies: |y| (2001..=2010).contains(&y),
        render: |y| format!("{y} was in the post-9/11 era, marked by global security concerns and rapid technological advancement."),
    },
    PeriodRule {
        name: "pandemic",
        applies: |y| y >= 2020,
        render: |y| format!("{y} was during the COVID-19 pandemic era, a time of global health crisis and social transformation."),
    },
    PeriodRule {
        name: "industrial_age",
        applies: |y| (1800..1900).contains(&y),
        render: |y| format!("{y} fell in the industrial age, when steam power, railways and factories reshaped work and cities."),
    },
    PeriodRule {
        name: "early_modern_era",
        applies: |y| (1500..1800).contains(&y),
        render: |y| format!("{y} belonged to the early modern era of exploration, trade empires and scientific inquiry."),
    },
];

const GENERIC_TEMPLATES: [fn(i32) -> String; 3] = [
    |y| format!("{y} was a year of historical significance with various global developments and cultural changes."),
    |y| format!("During {y}, societies worldwide continued to evolve through technological and social progress."),
    |y| format!("{y} marked another year in the ongoing story of human civilization and cultural development."),
];

/// Contextual placeholder text; deterministic per year.
pub fn contextual_text(year: i32) -> String {
    if let Some(rule) = PERIOD_RULES.iter().find(|r| (r.applies)(year)) {
        return (rule.render)(year);
    }
    let idx = year.rem_euclid(GENERIC_TEMPLATES.len() as i32) as usize;
    GENERIC_TEMPLATES[idx](year)
}

/// Never fails: curated record when one exists, else a generated placeholder.
pub fn fallback_event(year: i32) -> EventRecord {
    if let Some(rec) = curated_event(year) {
        return rec;
    }
    EventRecord::new(
        year,
        format!("Events of {year}"),
        contextual_text(year),
        SOURCE_GENERATED,
    )
}
