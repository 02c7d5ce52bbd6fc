//! # Visualization
//!
//! Display ready trees of the matches of a tournament.
//!
//! A tree is built from a few elements which can describe the layout of every format:
//! - A [`Row`] is a horizontal container, e.g. the rounds of a bracket.
//! - A [`Column`] is a vertical container, e.g. the matches of a round.
//! - A [`MatchView`] is a leaf element displaying a single match.
//! - A bye is a leaf placeholder for a participant skipping the first round.
//!
//! [`Row`]: ElementInner::Row
//! [`Column`]: ElementInner::Column
use std::collections::{BTreeMap, BTreeSet};

use crate::tournament::TournamentKind;
use crate::utils::identifier;
use crate::{participant, Match, MatchId, MatchState, Matches, Participant, ParticipantId, Section};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A display ready tree of all matches of a tournament.
///
/// The root is a column of sections, in order: groups, the main bracket (or rounds), the
/// losers bracket, the finals and events.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Visualization {
    pub kind: TournamentKind,
    pub root: Element,
}

impl Visualization {
    /// Builds the tree for `matches`. With `compact` set, first round byes of elimination
    /// brackets are omitted instead of shown as placeholders.
    pub fn new(
        kind: TournamentKind,
        matches: &Matches,
        participants: &[Participant],
        compact: bool,
    ) -> Self {
        let layout = Layout {
            kind,
            matches,
            participants,
            compact,
            has_losers: matches.iter().any(|m| m.section == Section::Losers),
        };

        let mut sections = Vec::new();

        let groups: BTreeSet<_> = matches
            .iter()
            .filter_map(|m| match m.section {
                Section::Group(group) => Some(group),
                _ => None,
            })
            .collect();

        for group in groups {
            let label = format!("Group {}", identifier(group.saturating_sub(1) as usize));
            sections.push(Element::row(layout.rounds(Section::Group(group))).with_label(label));
        }

        let main = layout.rounds(Section::Main);
        if !main.is_empty() {
            let mut element = Element::row(main);
            if layout.has_losers {
                element = element.with_label("Winners Bracket");
            }

            sections.push(element);
        }

        if layout.has_losers {
            sections.push(Element::row(layout.rounds(Section::Losers)).with_label("Losers Bracket"));
        }

        let finals: Vec<_> = [
            Section::GrandFinal,
            Section::GrandFinalReset,
            Section::ThirdPlace,
        ]
        .into_iter()
        .flat_map(|section| layout.rounds(section))
        .collect();
        if !finals.is_empty() {
            sections.push(Element::row(finals).with_label("Finals"));
        }

        let events = layout.rounds(Section::Event);
        if !events.is_empty() {
            sections.push(Element::row(events));
        }

        Self {
            kind,
            root: Element::column(sections),
        }
    }

    /// Returns all matches in the tree, depth first.
    pub fn matches(&self) -> Vec<&MatchView> {
        self.root.matches()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Element {
    pub label: Option<String>,
    pub position: Option<Position>,
    pub inner: ElementInner,
}

impl Element {
    pub(crate) fn new(inner: ElementInner) -> Self {
        Self {
            label: None,
            position: None,
            inner,
        }
    }

    fn row(children: Vec<Element>) -> Self {
        Self::new(ElementInner::Row(children))
    }

    fn column(children: Vec<Element>) -> Self {
        Self::new(ElementInner::Column(children))
    }

    fn with_label<T>(mut self, label: T) -> Self
    where
        T: Into<String>,
    {
        self.label = Some(label.into());
        self
    }

    fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[inline]
    pub fn kind(&self) -> ElementKind {
        match self.inner {
            ElementInner::Row(_) => ElementKind::Row,
            ElementInner::Column(_) => ElementKind::Column,
            ElementInner::Match(_) => ElementKind::Match,
            ElementInner::Bye(_) => ElementKind::Bye,
        }
    }

    /// Returns the children of a container. Leaf elements have no children.
    pub fn children(&self) -> &[Element] {
        match &self.inner {
            ElementInner::Row(children) | ElementInner::Column(children) => children,
            ElementInner::Match(_) | ElementInner::Bye(_) => &[],
        }
    }

    /// Returns all matches within this element, depth first.
    pub fn matches(&self) -> Vec<&MatchView> {
        match &self.inner {
            ElementInner::Match(m) => vec![m],
            _ => self.children().iter().flat_map(Element::matches).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ElementInner {
    Row(Vec<Element>),
    Column(Vec<Element>),
    Match(MatchView),
    /// A participant advancing without playing the first round.
    Bye(EntrantView),
}

/// A leaf element in the tree representing a *match*, *heat* or *event*.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchView {
    pub id: MatchId,
    pub identifier: String,
    pub play_order: u32,
    pub state: MatchState,
    pub underway: bool,
    pub station: Option<String>,
    pub entrants: Vec<EntrantView>,
    /// The matches feeding into this match.
    pub predecessors: Vec<Predecessor>,
}

/// A participant (or a placeholder for one) within a [`MatchView`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntrantView {
    pub participant: Option<ParticipantId>,
    pub name: Option<String>,
    pub seed: Option<u32>,
    pub score: Option<u32>,
    /// The finishing position in a heat or event.
    pub position: Option<u32>,
    pub winner: bool,
}

/// A predecessor hint of a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Predecessor {
    pub kind: PredecessorKind,
    pub source_match: MatchId,
    /// Destination slot within the next match.
    pub destination_index: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PredecessorKind {
    Winner,
    Loser,
}

/// A `Position` gives the renderer a hint how the elements of a container should be
/// distributed.
///
/// Note that a `Position` is purely a hint, a renderer may decide to ignore it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Position {
    /// Hints that the elements should be rendered at the start of the container.
    ///
    /// # Examples
    ///
    /// ```text
    /// |   Round 1    |   Round 2    |
    /// | ------------ | ------------ |
    /// | | -------- | | | -------- | |
    /// | | Match[0] | | | Match[2] | |
    /// | | -------- | | | -------- | |
    /// |              |              |
    /// | | -------- | |              |
    /// | | Match[1] | |              |
    /// | | -------- | |              |
    /// ```
    Start,
    End,
    /// Hints that the elements should be centered between their predecessors.
    ///
    /// # Examples
    ///
    /// ```text
    /// | Semi-Finals  |    Final     |
    /// | ------------ | ------------ |
    /// | | -------- | |              |
    /// | | Match[0] | |              |
    /// | | -------- | | | -------- | |
    /// |              | | Match[2] | |
    /// | | -------- | | | -------- | |
    /// | | Match[1] | |              |
    /// | | -------- | |              |
    /// ```
    SpaceAround,
    SpaceBetween,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Row,
    Column,
    Match,
    Bye,
}

impl ElementKind {
    #[inline]
    pub fn is_column(&self) -> bool {
        matches!(self, Self::Column)
    }

    #[inline]
    pub fn is_row(&self) -> bool {
        matches!(self, Self::Row)
    }

    #[inline]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

struct Layout<'a> {
    kind: TournamentKind,
    matches: &'a Matches,
    participants: &'a [Participant],
    compact: bool,
    has_losers: bool,
}

impl<'a> Layout<'a> {
    fn is_elimination(&self) -> bool {
        matches!(
            self.kind,
            TournamentKind::SingleElimination
                | TournamentKind::DoubleElimination
                | TournamentKind::TwoStage
        )
    }

    /// Returns one labeled column per round of `section`.
    fn rounds(&self, section: Section) -> Vec<Element> {
        let mut rounds: BTreeMap<u32, Vec<&Match>> = BTreeMap::new();
        for m in self.matches.iter().filter(|m| m.section == section) {
            rounds.entry(m.round.unsigned_abs()).or_default().push(m);
        }

        for round in rounds.values_mut() {
            round.sort_by_key(|m| m.id);
        }

        let last = rounds.keys().next_back().copied().unwrap_or(0);
        let position = if self.is_elimination() {
            Position::SpaceAround
        } else {
            Position::Start
        };

        rounds
            .iter()
            .map(|(&round, matches)| {
                let children = if round == 1
                    && section == Section::Main
                    && self.is_elimination()
                    && !self.compact
                {
                    let next = rounds.get(&2).map(Vec::as_slice).unwrap_or(&[]);
                    self.with_byes(matches, next)
                } else {
                    matches.iter().map(|m| self.match_element(m)).collect()
                };

                Element::column(children)
                    .with_label(self.round_label(section, round, last))
                    .with_position(position)
            })
            .collect()
    }

    /// Lays out the first round in bracket order, inserting a bye for every participant
    /// entering the second round directly.
    fn with_byes(&self, first: &[&Match], second: &[&Match]) -> Vec<Element> {
        let mut children = Vec::with_capacity(second.len() * 2);
        let mut placed = 0;

        for m in second {
            for slot in &m.entrants {
                match (slot.source, slot.entrant) {
                    (Some(source), _) if !source.is_loser => {
                        if let Some(feeder) = first.iter().find(|f| f.id == source.match_id) {
                            children.push(self.match_element(feeder));
                            placed += 1;
                        }
                    }
                    (None, Some(id)) => {
                        children.push(
                            Element::new(ElementInner::Bye(self.entrant(Some(id))))
                                .with_label("Bye"),
                        );
                    }
                    _ => (),
                }
            }
        }

        if placed != first.len() {
            return first.iter().map(|m| self.match_element(m)).collect();
        }

        children
    }

    fn match_element(&self, m: &Match) -> Element {
        let entrants = m
            .entrants
            .iter()
            .map(|slot| {
                let mut view = self.entrant(slot.entrant);
                if let Some(id) = slot.entrant {
                    view.score = m.score_of(id);
                    view.position = m
                        .placements
                        .iter()
                        .find(|p| p.participant == id)
                        .map(|p| p.position);
                    view.winner = m.winner == Some(id);
                }

                view
            })
            .collect();

        let predecessors = m
            .entrants
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let source = slot.source?;
                Some(Predecessor {
                    kind: if source.is_loser {
                        PredecessorKind::Loser
                    } else {
                        PredecessorKind::Winner
                    },
                    source_match: source.match_id,
                    destination_index: index,
                })
            })
            .collect();

        Element::new(ElementInner::Match(MatchView {
            id: m.id,
            identifier: m.identifier.clone(),
            play_order: m.play_order,
            state: m.state,
            underway: m.underway,
            station: m.station.clone(),
            entrants,
            predecessors,
        }))
    }

    fn entrant(&self, id: Option<ParticipantId>) -> EntrantView {
        let participant = id.and_then(|id| participant::find(self.participants, id));

        EntrantView {
            participant: id,
            name: participant.map(|p| p.name.clone()),
            seed: participant.map(|p| p.seed),
            ..Default::default()
        }
    }

    fn round_label(&self, section: Section, round: u32, last: u32) -> String {
        match section {
            Section::Main if self.is_elimination() => {
                let prefix = if self.has_losers { "Winners " } else { "" };
                match last - round {
                    0 => format!("{}Final", prefix),
                    1 => format!("{}Semi-Finals", prefix),
                    2 if !self.has_losers => String::from("Quarter-Finals"),
                    _ => format!("{}Round {}", prefix, round),
                }
            }
            Section::Main | Section::Group(_) => format!("Round {}", round),
            Section::Losers if round == last => String::from("Losers Final"),
            Section::Losers => format!("Losers Round {}", round),
            Section::ThirdPlace => String::from("Third Place"),
            Section::GrandFinal => String::from("Grand Final"),
            Section::GrandFinalReset => String::from("Grand Final Reset"),
            Section::Event => format!("Event {}", round),
        }
    }
}
