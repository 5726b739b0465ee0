/**
 * The validated structure of a test bank, and the algorithms that turn each category's
 * facts into questions with sensible choices.
 *
 * Author:  Ian Fisher (iafisher@protonmail.com)
 * Version: October 2019
 */
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::{thread_rng, Rng};
use serde::Serialize;

use super::common::{QuizError, Result, StructureError};
use super::testbank::{Node, NodeKind};


/// Represents an entire test.
#[derive(Debug)]
pub struct UnitTest {
    pub name: String,
    pub chapters: Vec<Chapter>,
}


#[derive(Debug)]
pub struct Chapter {
    pub name: String,
    pub sections: Vec<Section>,
}


#[derive(Debug)]
pub struct Section {
    pub name: String,
    pub categories: Vec<Category>,
}


/// A group of facts that are all asked in the same way.
#[derive(Debug)]
pub struct Category {
    pub kind: CategoryKind,
    pub facts: Vec<Fact>,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CategoryKind {
    Matching, MultipleChoice, TrueOrFalse,
}


/// The smallest unit of a test bank. Every question of a fact may be answered by every
/// one of its answers.
#[derive(Debug)]
pub struct Fact {
    /// Facts of matching and multiple-choice categories only share choices with facts
    /// that have the same label.
    pub label: Option<String>,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
}


/// A question that is ready to be asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub category: CategoryKind,
    pub label: Option<String>,
    pub question: String,
    /// The choices in the order they should be displayed. Exactly one of them is
    /// `answer`.
    pub choices: Vec<String>,
    pub answer: String,
}


type Mapping<'a> = BTreeMap<&'a str, BTreeSet<&'a str>>;


impl UnitTest {
    /// Validate the whole document. Nothing is returned unless every level of the
    /// hierarchy is valid.
    pub fn from_node(root: &Node) -> Result<Self> {
        expect_kind(root, NodeKind::TestBank)?;
        let name = root.attr_or_empty().to_string();
        let chapters = root.children.iter()
            .map(Chapter::from_node)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.within("unit test", &name))?;
        if chapters.is_empty() {
            return Err(QuizError::from(StructureError::EmptyUnitTest).within("unit test", &name));
        }
        Ok(UnitTest { name, chapters })
    }

    /// Build every category once and throw the results away, so that problems that
    /// only show up while building are reported before a session starts.
    pub fn verify(&self) -> Result<()> {
        let mut rng = thread_rng();
        for chapter in self.chapters.iter() {
            for section in chapter.sections.iter() {
                for category in section.categories.iter() {
                    category.build(&mut rng)
                        .map_err(|e| e.within("section", &section.name))
                        .map_err(|e| e.within("chapter", &chapter.name))
                        .map_err(|e| e.within("unit test", &self.name))?;
                }
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> TestSummary {
        TestSummary {
            name: self.name.clone(),
            chapters: self.chapters.iter().map(|chapter| {
                ChapterSummary {
                    name: chapter.name.clone(),
                    sections: chapter.sections.iter().map(|section| {
                        SectionSummary {
                            name: section.name.clone(),
                            categories: section.categories.iter().map(|category| {
                                CategorySummary {
                                    kind: category.kind,
                                    facts: category.facts.len(),
                                    questions: category.facts.iter()
                                        .map(|f| f.questions.len())
                                        .sum(),
                                }
                            }).collect(),
                        }
                    }).collect(),
                }
            }).collect(),
        }
    }
}


impl Chapter {
    pub fn from_node(node: &Node) -> Result<Self> {
        expect_kind(node, NodeKind::Chapter)?;
        let name = node.attr_or_empty().to_string();
        let sections = node.children.iter()
            .map(Section::from_node)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.within("chapter", &name))?;
        if sections.is_empty() {
            return Err(QuizError::from(StructureError::EmptyChapter).within("chapter", &name));
        }
        Ok(Chapter { name, sections })
    }
}


impl Section {
    pub fn from_node(node: &Node) -> Result<Self> {
        expect_kind(node, NodeKind::Section)?;
        let name = node.attr_or_empty().to_string();
        let categories = node.children.iter()
            .map(Category::from_node)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.within("section", &name))?;
        if categories.is_empty() {
            return Err(QuizError::from(StructureError::EmptySection).within("section", &name));
        }
        Ok(Section { name, categories })
    }
}


impl Category {
    pub fn from_node(node: &Node) -> Result<Self> {
        expect_kind(node, NodeKind::Category)?;
        let kind = CategoryKind::from_attr(node.attr_or_empty())?;
        let facts = node.children.iter()
            .map(|child| Fact::from_node(child, kind))
            .collect::<Result<Vec<_>>>()?;
        if facts.is_empty() {
            return Err(StructureError::EmptyCategory.into());
        }
        Ok(Category { kind, facts })
    }

    /// Turn the facts of the category into records with freshly chosen and shuffled
    /// choices. The records are in no particular order.
    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Record>> {
        debug!("Building {} category with {} fact(s)", self.kind, self.facts.len());
        match self.kind {
            CategoryKind::Matching | CategoryKind::MultipleChoice => {
                Ok(self.build_choices(rng))
            },
            CategoryKind::TrueOrFalse => {
                self.build_true_or_false(rng)
            },
        }
    }

    /// Implementation of `build` for matching and multiple-choice categories.
    fn build_choices<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Record> {
        let mut groups: BTreeMap<Option<&str>, (Mapping<'_>, Mapping<'_>)> = BTreeMap::new();
        for fact in self.facts.iter() {
            let label = fact.label.as_ref().map(|l| l.as_str());
            let (questions, answers) = groups.entry(label).or_default();
            merge(questions, fact.question_to_answers());
            merge(answers, fact.answer_to_questions());
        }

        let mut records = Vec::new();
        for (label, (questions, answers)) in groups.iter() {
            for (question, right_answers) in questions.iter() {
                let wrong = answers.keys().filter(|a| !right_answers.contains(*a));
                let amount = self.kind.choices();
                let mut choices: Vec<String> = wrong
                    .choose_multiple(rng, amount)
                    .into_iter()
                    .map(|a| a.to_string())
                    .collect();
                // A fact always has at least one answer, so this never fails.
                let right = right_answers.iter().choose(rng)
                    .map(|a| a.to_string())
                    .unwrap_or_default();
                choices.push(right.clone());
                choices.shuffle(rng);

                records.push(Record {
                    category: self.kind,
                    label: label.map(String::from),
                    question: question.to_string(),
                    choices,
                    answer: right,
                });
            }
        }
        records
    }

    /// Implementation of `build` for true-or-false categories. Labels are ignored.
    fn build_true_or_false<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Record>> {
        let mut questions = Mapping::new();
        for fact in self.facts.iter() {
            merge(&mut questions, fact.question_to_answers());
        }

        let mut records = Vec::new();
        for (question, answers) in questions.iter() {
            if answers.len() != 1 {
                return Err(StructureError::AmbiguousTrueOrFalse(question.to_string()).into());
            }
            let mut choices = vec![String::from("True"), String::from("False")];
            choices.shuffle(rng);
            records.push(Record {
                category: self.kind,
                label: None,
                question: question.to_string(),
                choices,
                answer: answers.iter().next().map(|a| a.to_string()).unwrap_or_default(),
            });
        }
        Ok(records)
    }
}


/// Builds a category at most once for a session.
pub struct CategoryBuild<'a> {
    category: &'a Category,
    built: bool,
}


impl<'a> CategoryBuild<'a> {
    pub fn new(category: &'a Category) -> Self {
        CategoryBuild { category, built: false }
    }

    /// Build the category's records. Fails if the records have already been built,
    /// since a second build would hand out a different set of choices for the same
    /// session.
    pub fn build<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<Record>> {
        if self.built {
            return Err(QuizError::AlreadyBuilt);
        }
        self.built = true;
        self.category.build(rng)
    }
}


impl CategoryKind {
    fn from_attr(attr: &str) -> Result<Self> {
        match attr {
            "matching" => Ok(CategoryKind::Matching),
            "multiple_choice" => Ok(CategoryKind::MultipleChoice),
            "true_or_false" => Ok(CategoryKind::TrueOrFalse),
            other => Err(StructureError::UnknownCategory(other.to_string()).into()),
        }
    }

    /// The greatest number of wrong answers offered alongside the right one.
    pub fn choices(self) -> usize {
        match self {
            CategoryKind::Matching => 25,
            CategoryKind::MultipleChoice => 3,
            CategoryKind::TrueOrFalse => 1,
        }
    }
}


impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CategoryKind::Matching => write!(f, "Matching"),
            CategoryKind::MultipleChoice => write!(f, "Multiple Choice"),
            CategoryKind::TrueOrFalse => write!(f, "True or False"),
        }
    }
}


impl Fact {
    pub fn from_node(node: &Node, kind: CategoryKind) -> Result<Self> {
        expect_kind(node, NodeKind::Fact)?;
        let mut questions = Vec::new();
        let mut answers = Vec::new();
        for child in node.children.iter() {
            match child.kind {
                NodeKind::Question => {
                    questions.push(child.text.clone());
                },
                NodeKind::Answer => {
                    if kind == CategoryKind::TrueOrFalse
                        && child.text != "True" && child.text != "False" {
                        return Err(StructureError::InvalidTrueOrFalse(child.text.clone()).into());
                    }
                    answers.push(child.text.clone());
                },
                other => {
                    return Err(StructureError::UnexpectedNode(other.tag().to_string()).into());
                },
            }
        }
        if answers.is_empty() {
            return Err(StructureError::EmptyFact.into());
        }

        let label = match kind {
            CategoryKind::TrueOrFalse => None,
            _ => node.attr.clone(),
        };
        Ok(Fact { label, questions, answers })
    }

    /// Map each question to every answer of the fact.
    pub fn question_to_answers(&self) -> Mapping<'_> {
        let answers: BTreeSet<&str> = self.answers.iter().map(|a| a.as_str()).collect();
        self.questions.iter().map(|q| (q.as_str(), answers.clone())).collect()
    }

    /// Map each answer to every question of the fact.
    pub fn answer_to_questions(&self) -> Mapping<'_> {
        let questions: BTreeSet<&str> = self.questions.iter().map(|q| q.as_str()).collect();
        self.answers.iter().map(|a| (a.as_str(), questions.clone())).collect()
    }
}


fn merge<'a>(into: &mut Mapping<'a>, from: Mapping<'a>) {
    for (key, values) in from.into_iter() {
        into.entry(key).or_default().extend(values);
    }
}


fn expect_kind(node: &Node, kind: NodeKind) -> Result<()> {
    if node.kind == kind {
        Ok(())
    } else {
        Err(StructureError::UnexpectedNode(node.kind.tag().to_string()).into())
    }
}


#[derive(Debug, Serialize)]
pub struct TestSummary {
    pub name: String,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChapterSummary {
    pub name: String,
    pub sections: Vec<SectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct SectionSummary {
    pub name: String,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub kind: CategoryKind,
    pub facts: usize,
    pub questions: usize,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_choices_are_limited_by_pool() {
        let category = category("multiple_choice", vec![
            fact(Some("colors"), &["Color of sky"], &["Blue"]),
            fact(Some("colors"), &["Color of grass"], &["Green"]),
        ]);

        for _ in 0..20 {
            let records = category.build(&mut thread_rng()).unwrap();
            assert_eq!(records.len(), 2);
            let sky = records.iter().find(|r| r.question == "Color of sky").unwrap();
            assert_eq!(sky.answer, "Blue");
            assert_eq!(sky.choices.len(), 2);
            assert!(sky.choices.contains(&s("Blue")));
            assert!(sky.choices.contains(&s("Green")));
            assert_eq!(sky.label, Some(s("colors")));
            assert_eq!(sky.category, CategoryKind::MultipleChoice);
        }
    }

    #[test]
    fn multiple_choice_offers_at_most_three_wrong_answers() {
        let category = category("multiple_choice", vec![
            fact(Some("n"), &["One"], &["1"]),
            fact(Some("n"), &["Two"], &["2"]),
            fact(Some("n"), &["Three"], &["3"]),
            fact(Some("n"), &["Four"], &["4"]),
            fact(Some("n"), &["Five"], &["5"]),
            fact(Some("n"), &["Six"], &["6"]),
        ]);

        for record in category.build(&mut thread_rng()).unwrap().iter() {
            assert_eq!(record.choices.len(), 4);
            let count = record.choices.iter().filter(|c| **c == record.answer).count();
            assert_eq!(count, 1);
            let distinct: BTreeSet<_> = record.choices.iter().collect();
            assert_eq!(distinct.len(), 4);
        }
    }

    #[test]
    fn matching_offers_up_to_twenty_five_wrong_answers() {
        let facts = (0..30)
            .map(|i| {
                Node::new(NodeKind::Fact, None)
                    .with_child(Node::leaf(NodeKind::Question, &format!("Q{}", i)))
                    .with_child(Node::leaf(NodeKind::Answer, &format!("A{}", i)))
            })
            .collect::<Vec<_>>();
        let mut node = Node::new(NodeKind::Category, Some("matching"));
        node.children = facts;
        let category = Category::from_node(&node).unwrap();

        let records = category.build(&mut thread_rng()).unwrap();
        assert_eq!(records.len(), 30);
        for record in records.iter() {
            assert_eq!(record.choices.len(), 26);
            assert!(record.choices.contains(&record.answer));
        }
    }

    #[test]
    fn labels_keep_answer_pools_apart() {
        let category = category("multiple_choice", vec![
            fact(Some("colors"), &["Color of sky"], &["Blue"]),
            fact(Some("colors"), &["Color of grass"], &["Green"]),
            fact(Some("animals"), &["Barks"], &["Dog"]),
        ]);

        let records = category.build(&mut thread_rng()).unwrap();
        let barks = records.iter().find(|r| r.question == "Barks").unwrap();
        assert_eq!(barks.choices, vec![s("Dog")]);
        assert_eq!(barks.label, Some(s("animals")));
    }

    #[test]
    fn equivalent_answers_are_never_wrong_choices() {
        let category = category("multiple_choice", vec![
            fact(Some("p"), &["First president"], &["Washington", "George Washington"]),
            fact(Some("p"), &["Third president"], &["Jefferson"]),
        ]);

        for _ in 0..20 {
            let records = category.build(&mut thread_rng()).unwrap();
            let first = records.iter().find(|r| r.question == "First president").unwrap();
            assert_eq!(first.choices.len(), 2);
            assert!(first.choices.contains(&s("Jefferson")));
            assert!(first.answer == "Washington" || first.answer == "George Washington");
        }
    }

    #[test]
    fn answer_only_facts_add_distractors() {
        let category = category("multiple_choice", vec![
            fact(Some("c"), &["Capital of France"], &["Paris"]),
            fact(Some("c"), &[], &["Lyon"]),
        ]);

        let records = category.build(&mut thread_rng()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].choices.len(), 2);
        assert!(records[0].choices.contains(&s("Lyon")));
    }

    #[test]
    fn true_or_false_choices_are_true_and_false() {
        let category = category("true_or_false", vec![
            fact(None, &["Sky is blue"], &["True"]),
            fact(None, &["Grass is blue"], &["False"]),
        ]);

        let records = category.build(&mut thread_rng()).unwrap();
        assert_eq!(records.len(), 2);
        for record in records.iter() {
            let mut choices = record.choices.clone();
            choices.sort();
            assert_eq!(choices, vec![s("False"), s("True")]);
            assert_eq!(record.category, CategoryKind::TrueOrFalse);
        }
        let grass = records.iter().find(|r| r.question == "Grass is blue").unwrap();
        assert_eq!(grass.answer, "False");
    }

    #[test]
    fn true_or_false_rejects_contradictions() {
        let category = category("true_or_false", vec![
            fact(None, &["Sky is blue"], &["True"]),
            fact(None, &["Sky is blue"], &["False"]),
        ]);

        match category.build(&mut thread_rng()) {
            Err(QuizError::Structure { error, .. }) => {
                assert_eq!(error, StructureError::AmbiguousTrueOrFalse(s("Sky is blue")));
            },
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn true_or_false_answers_are_validated() {
        let node = category_node("true_or_false", vec![fact(None, &["Sky is blue"], &["Yes"])]);
        match Category::from_node(&node) {
            Err(QuizError::Structure { error, .. }) => {
                assert_eq!(error, StructureError::InvalidTrueOrFalse(s("Yes")));
            },
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn empty_levels_are_rejected_with_context() {
        let empty_fact = section_node(vec![category_node("matching", vec![fact(None, &["Q"], &[])])]);
        let root = Node::new(NodeKind::TestBank, Some("Bank")).with_child(
            Node::new(NodeKind::Chapter, Some("One")).with_child(empty_fact)
        );
        let err = UnitTest::from_node(&root).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unit test 'Bank' > chapter 'One' > section 'Intro': fact has no answers"
        );

        let root = Node::new(NodeKind::TestBank, Some("Bank"));
        assert_eq!(UnitTest::from_node(&root).unwrap_err().to_string(), "unit test 'Bank': unit test is empty");

        let root = Node::new(NodeKind::TestBank, Some("Bank"))
            .with_child(Node::new(NodeKind::Chapter, Some("One")));
        assert_eq!(
            UnitTest::from_node(&root).unwrap_err().to_string(),
            "unit test 'Bank' > chapter 'One': chapter is empty"
        );
    }

    #[test]
    fn unknown_category_is_rejected() {
        let node = category_node("essay", vec![fact(None, &["Q"], &["A"])]);
        match Category::from_node(&node) {
            Err(QuizError::Structure { error, .. }) => {
                assert_eq!(error, StructureError::UnknownCategory(s("essay")));
            },
            other => panic!("expected structure error, got {:?}", other),
        }
    }

    #[test]
    fn verify_reports_contradictions_in_context() {
        let root = Node::new(NodeKind::TestBank, Some("Bank")).with_child(
            Node::new(NodeKind::Chapter, Some("One")).with_child(section_node(vec![
                category_node("true_or_false", vec![
                    fact(None, &["Sky is blue"], &["True"]),
                    fact(None, &["Sky is blue"], &["False"]),
                ]),
            ]))
        );
        let test = UnitTest::from_node(&root).unwrap();
        assert_eq!(
            test.verify().unwrap_err().to_string(),
            "unit test 'Bank' > chapter 'One' > section 'Intro': question is both true and false: 'Sky is blue'"
        );
    }

    #[test]
    fn category_build_only_runs_once() {
        let category = category("true_or_false", vec![fact(None, &["Sky is blue"], &["True"])]);
        let mut build = CategoryBuild::new(&category);
        assert_eq!(build.build(&mut thread_rng()).unwrap().len(), 1);
        assert!(matches!(build.build(&mut thread_rng()), Err(QuizError::AlreadyBuilt)));
    }

    #[test]
    fn summary_counts_facts_and_questions() {
        let root = Node::new(NodeKind::TestBank, Some("Bank")).with_child(
            Node::new(NodeKind::Chapter, Some("One")).with_child(section_node(vec![
                category_node("matching", vec![
                    fact(None, &["Q1", "Q2"], &["A"]),
                    fact(None, &["Q3"], &["B"]),
                ]),
            ]))
        );
        let summary = UnitTest::from_node(&root).unwrap().summary();
        let category = &summary.chapters[0].sections[0].categories[0];
        assert_eq!(category.kind, CategoryKind::Matching);
        assert_eq!(category.facts, 2);
        assert_eq!(category.questions, 3);
    }

    fn fact(label: Option<&str>, questions: &[&str], answers: &[&str]) -> Node {
        let mut node = Node::new(NodeKind::Fact, label);
        for q in questions.iter() {
            node.children.push(Node::leaf(NodeKind::Question, q));
        }
        for a in answers.iter() {
            node.children.push(Node::leaf(NodeKind::Answer, a));
        }
        node
    }

    fn category_node(kind: &str, facts: Vec<Node>) -> Node {
        let mut node = Node::new(NodeKind::Category, Some(kind));
        node.children = facts;
        node
    }

    fn section_node(categories: Vec<Node>) -> Node {
        let mut node = Node::new(NodeKind::Section, Some("Intro"));
        node.children = categories;
        node
    }

    fn category(kind: &str, facts: Vec<Node>) -> Category {
        Category::from_node(&category_node(kind, facts)).unwrap()
    }

    fn s(mystr: &str) -> String {
        String::from(mystr)
    }
}
