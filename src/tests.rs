#[cfg(test)]
pub(crate) mod support {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use crate::error::CodecError;
    use crate::fumen::{Fumen, FumenCodec, Page};
    use crate::piece::Queue;

    /// Keeps pages by name; encoding stores the pages under a fresh name.
    #[derive(Default)]
    pub(crate) struct MemoryCodec {
        store: RefCell<HashMap<Fumen, Vec<Page>>>,
    }

    impl MemoryCodec {
        pub(crate) fn with_comments(fumens: &[(&str, &str)]) -> Self {
            let codec = Self::default();
            for (name, comment) in fumens {
                codec.register(name, vec![Page { field: None, comment: Some(comment.to_string()) }]);
            }
            codec
        }

        pub(crate) fn register(&self, name: &str, pages: Vec<Page>) {
            self.store.borrow_mut().insert(Fumen::from(name), pages);
        }
    }

    impl FumenCodec for MemoryCodec {
        fn decode(&self, fumen: &Fumen) -> Result<Vec<Page>, CodecError> {
            self.store.borrow().get(fumen).cloned().ok_or_else(|| CodecError::Decode {
                fumen: fumen.to_string(),
                reason: "unknown fumen".to_string(),
            })
        }

        fn encode(&self, pages: &[Page]) -> Result<Fumen, CodecError> {
            let mut store = self.store.borrow_mut();
            let fumen = Fumen::new(format!("v115@{}", store.len()));
            store.insert(fumen.clone(), pages.to_vec());
            Ok(fumen)
        }
    }

    pub(crate) fn queues(list: &[&str]) -> Vec<Queue> {
        list.iter().map(|queue| queue.parse().unwrap()).collect()
    }
}

#[cfg(test)]
mod piece_tests {
    use pretty_assertions::assert_eq;

    use crate::error::ParseError;
    use crate::piece::{Piece, Queue};
    use crate::tests::support::queues;

    #[test]
    fn ranks_follow_bag_order() {
        assert_eq!(Piece::T.rank(), 1);
        assert_eq!(Piece::O.rank(), 7);
        assert_eq!("OZSJLIT".parse::<Queue>().unwrap().sorted().to_string(), "TILJSZO");
    }

    #[test]
    fn queues_order_like_rank_numbers() {
        let mut list = queues(&["IT", "T", "TI", "OO", "Z"]);
        list.sort();
        assert_eq!(list, queues(&["T", "Z", "TI", "IT", "OO"]));
    }

    #[test]
    fn mirror_swaps_l_j_and_s_z() {
        assert_eq!("TLJSZ".parse::<Queue>().unwrap().mirrored().to_string(), "TJLZS");
    }

    #[test]
    fn rejects_unknown_piece() {
        assert_eq!("TX".parse::<Queue>(), Err(ParseError::InvalidPiece('X')));
    }

    #[test]
    fn multiset_subset_counts_repeats() {
        let save: Queue = "TTI".parse().unwrap();
        assert!("TT".parse::<Queue>().unwrap().is_multiset_subset_of(&save));
        assert!(!"TTT".parse::<Queue>().unwrap().is_multiset_subset_of(&save));
        assert!(!"O".parse::<Queue>().unwrap().is_multiset_subset_of(&save));
    }
}

#[cfg(test)]
mod pattern_tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use crate::error::ParseError;
    use crate::pattern::{expand, mirror_pattern, pieces_contains, ExpandedPattern};
    use crate::piece::Queue;
    use crate::tests::support::queues;

    #[test]
    fn choose_two_of_three() {
        assert_eq!(expand("[TIL]p2").unwrap(), queues(&["TI", "TL", "IT", "IL", "LT", "LI"]));
    }

    #[test]
    fn full_bag_permutations() {
        assert_eq!(expand("*!").unwrap().len(), 5040);
        assert_eq!(expand("*p7").unwrap(), expand("*!").unwrap());
        assert_eq!(expand("*p2").unwrap().len(), 42);
    }

    #[rstest]
    #[case("T", &["T"])]
    #[case("TT", &["TT"])]
    #[case("T,[IO]", &["TI", "TO"])]
    #[case("[^TIL]", &["J", "S", "Z", "O"])]
    #[case("T;I", &["T", "I"])]
    #[case("T\nI\n\n", &["T", "I"])]
    #[case("(T,I)O", &["TIO"])]
    #[case("[TI]p2{T<I}", &["TI"])]
    #[case("[TIO]p2{I=0}", &["TO", "OT"])]
    #[case("[TIO]p2{/^O/}", &["OT", "OI"])]
    #[case("[TIO]p2{!/^O/}", &["TI", "TO", "IT", "IO"])]
    #[case("[TIO]p2{1:T=1}", &["TI", "TO"])]
    #[case("[TIO]p2{T=0 || /O$/}", &["TO", "IO", "OI"])]
    #[case("[TIO]p2{T=1 && O=1}", &["TO", "OT"])]
    #[case("[TIO]p2{TI=1}", &["TI", "IT"])]
    #[case("[TIO]p2{!(T=1)}", &["IO", "OI"])]
    #[case("[TIO]p3{T<[IO]}", &["TIO", "TOI", "ITO", "OTI"])]
    fn expands(#[case] pattern: &str, #[case] expected: &[&str]) {
        assert_eq!(expand(pattern).unwrap(), queues(expected));
    }

    #[rstest]
    #[case("[^TILJSZO]")]
    #[case("[TI]p3")]
    #[case("(T")]
    #[case("T)")]
    #[case("[TI")]
    #[case("X")]
    #[case("<file>")]
    #[case("T{T=1 & I=0}")]
    #[case("T{T=1 &&}")]
    #[case("T{&& T=1}")]
    #[case("T{T=1")]
    #[case("T{T?1}")]
    #[case("T{/[/}")]
    fn rejects(#[case] pattern: &str) {
        assert!(expand(pattern).is_err(), "{pattern} should not expand");
    }

    #[test]
    fn error_kinds() {
        assert!(matches!(expand("[^TILJSZO]"), Err(ParseError::EmptyPieceSet(_))));
        assert_eq!(expand("[TI]p3"), Err(ParseError::PermutationTooLong {
            pattern: "[TI]p3".to_string(),
            pieces: "[TI]".to_string(),
            length: 3,
            available: 2,
        }));
        assert!(matches!(expand("T)"), Err(ParseError::UnmatchedParenthesis(_))));
        assert_eq!(expand("T{T=1 & I=0}"), Err(ParseError::LoneOperator('&')));
        assert!(matches!(expand("T{T=1 &&}"), Err(ParseError::IncompleteModifier(_))));
        assert!(matches!(expand("T{T=1"), Err(ParseError::UnclosedModifier(_))));
    }

    #[test]
    fn containment() {
        assert_eq!(pieces_contains("TI", "[TIL]p2"), Ok(Some(0)));
        assert_eq!(pieces_contains("LI", "[TIL]p2"), Ok(Some(5)));
        assert_eq!(pieces_contains("TT", "[TIL]p2"), Ok(None));
        assert_eq!(pieces_contains("TX", "[TIL]p2"), Err(ParseError::InvalidPiece('X')));

        let expanded = ExpandedPattern::new("*p3{T=0}").unwrap();
        assert_eq!(expanded.len(), 120);
        assert!(expanded.contains(&"IOS".parse().unwrap()));
        assert!(!expanded.contains(&"ITO".parse().unwrap()));
    }

    #[rstest]
    #[case("LS", "JZ")]
    #[case("[LS]p2", "[JZ]p2")]
    #[case("SLp2", "ZLp2")]
    #[case("T,*p3", "T,*p3")]
    fn mirrors(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(mirror_pattern(pattern), expected);
    }

    const PATTERNS: [&str; 6] = ["[TIL]p2", "*p2", "T,[^T]p2", "[SZO]!", "*p3{T<I}", "(I,O)[TJ]"];

    proptest! {
        #[test]
        fn expansion_is_sorted_and_repeatable(pattern in prop::sample::select(PATTERNS.to_vec())) {
            let first = expand(pattern).unwrap();
            prop_assert_eq!(&first, &expand(pattern).unwrap());
            prop_assert!(first.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn containment_agrees_with_expansion(pattern in prop::sample::select(PATTERNS.to_vec()), queue in "[TILJSZO]{1,4}") {
            let expanded = ExpandedPattern::new(pattern).unwrap();
            let queue: Queue = queue.parse().unwrap();
            prop_assert_eq!(expanded.contains(&queue), expanded.queues().iter().any(|q| *q == queue));
            for member in expanded.queues() {
                prop_assert!(expanded.contains(member));
            }
        }
    }
}

#[cfg(test)]
mod query_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::error::ParseError;
    use crate::query::{evaluate, evaluate_all, first_match, parse, tokenize, Token, WantedSave};
    use crate::tests::support::queues;

    #[rstest]
    #[case("TIL", &["TIL"], true)]
    #[case("TIL", &["TI"], false)]
    #[case("TIL || /^O/", &["O"], true)]
    #[case("^T", &["T", "I"], true)]
    #[case("^T", &["T"], false)]
    #[case("TT", &["TI"], false)]
    #[case("TT", &["TTI"], true)]
    #[case("!T", &["I", "O"], true)]
    #[case("!T", &["T", "O"], false)]
    #[case("T && (I || O)", &["TO"], true)]
    #[case("T && !O", &["TO", "T"], false)]
    fn evaluates(#[case] expression: &str, #[case] saves: &[&str], #[case] expected: bool) {
        assert_eq!(evaluate(&parse(expression).unwrap(), &queues(saves)), expected);
    }

    #[rstest]
    #[case("T", &["T", "I", "TI"], vec![0, 2])]
    #[case("T && I", &["T", "I", "TI"], vec![1, 2])]
    #[case("O && I", &["T", "I"], vec![])]
    #[case("O || I", &["T", "I"], vec![1])]
    #[case("!T", &["T", "I", "TI"], vec![1])]
    #[case("^T", &["T", "I", "O"], vec![1, 2])]
    #[case("/^T/", &["TI", "IT"], vec![0])]
    fn evaluates_all(#[case] expression: &str, #[case] saves: &[&str], #[case] expected: Vec<usize>) {
        assert_eq!(evaluate_all(&parse(expression).unwrap(), &queues(saves)), expected);
    }

    #[test]
    fn tokens() {
        assert_eq!(tokenize("T&&!(/^O/ || IO)").unwrap(), vec![
            Token::Pieces("T".to_string()),
            Token::And,
            Token::Not,
            Token::LParen,
            Token::Regex("^O".to_string()),
            Token::Or,
            Token::Pieces("IO".to_string()),
            Token::RParen,
        ]);
    }

    #[test]
    fn precedence() {
        assert_eq!(parse("T || I && !O").unwrap().to_string(), "(Pieces(T) OR (Pieces(I) AND (NOT Pieces(O))))");
        assert_eq!(parse("(T || I) && ^O").unwrap().to_string(), "((Pieces(T) OR Pieces(I)) AND (AVOID Pieces(O)))");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(tokenize("T $"), Err(ParseError::UnknownToken { expression: "T $".to_string(), remainder: "$".to_string() }));
        assert!(matches!(parse(""), Err(ParseError::NoTokens(_))));
        assert!(matches!(parse("   "), Err(ParseError::NoTokens(_))));
        assert!(matches!(parse("(T"), Err(ParseError::UnmatchedParenthesis(_))));
        assert!(matches!(parse("T I"), Err(ParseError::TrailingInput { .. })));
        assert!(matches!(parse("T)"), Err(ParseError::TrailingInput { .. })));
        assert!(matches!(parse("T &&"), Err(ParseError::UnexpectedEnd(_))));
        assert!(matches!(parse(")"), Err(ParseError::UnexpectedToken { .. })));
        assert!(matches!(parse("/(/"), Err(ParseError::InvalidRegex { .. })));
    }

    #[test]
    fn first_satisfied_query_wins() {
        let wanted = ["O", "T", "TI"].map(|expression| expression.parse::<WantedSave>().unwrap());
        assert_eq!(first_match(&wanted, &queues(&["TI"])), Some(1));
        assert_eq!(first_match(&wanted, &queues(&["L"])), None);
        assert_eq!(wanted[2].expression(), "TI");
    }
}

#[cfg(test)]
mod fraction_tests {
    use pretty_assertions::assert_eq;

    use crate::error::FractionError;
    use crate::fraction::Fraction;

    #[test]
    fn zero_denominator_fails() {
        assert_eq!(Fraction::new(3, 0), Err(FractionError { numerator: 3 }));
    }

    #[test]
    fn renders_raw_counts() {
        assert_eq!(Fraction::new(1, 4).unwrap().to_string(), "1/4");
        assert_eq!(Fraction::new(2, 4).unwrap().to_string(), "2/4");
        assert_eq!(Fraction::new(2, 3).unwrap().label(), "66.67% (2/3)");
        assert_eq!(Fraction::new(3, 3).unwrap().label(), "100.00% (3/3)");
    }
}

#[cfg(test)]
mod formulas_tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::formulas::{bag_composition, leftover_len_to_pc_num, pc_num, pc_num_to_leftover_len};

    #[rstest]
    #[case(1, 7)]
    #[case(2, 4)]
    #[case(3, 1)]
    #[case(4, 5)]
    #[case(5, 2)]
    #[case(6, 6)]
    #[case(7, 3)]
    fn leftover_lengths(#[case] pc: u8, #[case] leftover: usize) {
        assert_eq!(pc_num_to_leftover_len(pc), leftover);
        assert_eq!(leftover_len_to_pc_num(leftover), pc);
    }

    #[rstest]
    #[case(7, 11, vec![7, 4])]
    #[case(4, 11, vec![4, 7])]
    #[case(1, 11, vec![1, 7, 3])]
    #[case(7, 6, vec![7])]
    #[case(1, 6, vec![1, 5])]
    fn compositions(#[case] leftover: usize, #[case] total: usize, #[case] expected: Vec<usize>) {
        assert_eq!(bag_composition(leftover, total), expected);
    }

    #[test]
    fn pc_number_from_game_state() {
        assert_eq!(pc_num(0, 0), 1);
        assert_eq!(pc_num(10, 0), 2);
        assert_eq!(pc_num(20, 0), 3);
    }
}

#[cfg(test)]
mod fumen_tests {
    use pretty_assertions::assert_eq;

    use crate::error::CodecError;
    use crate::fumen::{combine, combine_with_comments, comments, gray, height, is_pc, is_two_line, split, Field, Fumen, Page};
    use crate::tests::support::MemoryCodec;

    fn field(rows: &[&str]) -> Field {
        Field::from_rows(rows).unwrap()
    }

    #[test]
    fn field_shape() {
        let field = field(&["__________", "TTTIIIILLL", "XXXXXXXXXX"]);
        assert_eq!(field.height(), 2);
        assert!(field.is_cleared_shape());
        assert_eq!(field.grayed().rows(), vec!["__________", "XXXXXXXXXX", "XXXXXXXXXX"]);
        assert!(matches!(Field::from_rows(&["TTT"]), Err(CodecError::InvalidField(_))));
        assert!(matches!(Field::from_rows(&["TTTIIIILLQ"]), Err(CodecError::InvalidField(_))));
    }

    #[test]
    fn page_from_json() {
        let page: Page = serde_json::from_str(r#"{"field": ["TTT_______", "XXXXXXXXXX"], "comment": "TIL"}"#).unwrap();
        assert_eq!(page.comment.as_deref(), Some("TIL"));
        assert_eq!(page.field.map(|field| field.height()), Some(2));
        let bare: Page = serde_json::from_str("{}").unwrap();
        assert_eq!(bare, Page::default());
    }

    #[test]
    fn combine_and_split() {
        let codec = MemoryCodec::with_comments(&[("A", "first"), ("B", "second")]);
        let (a, b) = (Fumen::from("A"), Fumen::from("B"));

        let combined = combine(&codec, [&a, &b]).unwrap();
        assert_eq!(comments(&codec, &combined).unwrap(), vec!["first", "second"]);

        let labelled = combine_with_comments(&codec, &[a.clone(), b.clone()], &["1".to_string(), "2".to_string()]).unwrap();
        assert_eq!(comments(&codec, &labelled).unwrap(), vec!["1", "2"]);

        let pages = split(&codec, &combined).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(comments(&codec, &pages[1]).unwrap(), vec!["second"]);

        assert!(matches!(combine(&codec, std::iter::empty::<&Fumen>()), Err(CodecError::Empty)));
        assert!(matches!(comments(&codec, &Fumen::from("missing")), Err(CodecError::Decode { .. })));
    }

    #[test]
    fn shape_checks() {
        let codec = MemoryCodec::default();
        codec.register("two", vec![Page { field: Some(field(&["__________", "TTTIIIILLL", "XXXXXXXXXX"])), comment: None }]);
        codec.register("holey", vec![Page { field: Some(field(&["TTT_______", "XXXXXXXXXX"])), comment: None }]);
        let (two, holey) = (Fumen::from("two"), Fumen::from("holey"));

        assert!(is_pc(&codec, &two).unwrap());
        assert!(is_two_line(&codec, &two).unwrap());
        assert!(!is_pc(&codec, &holey).unwrap());
        assert_eq!(height(&codec, &holey).unwrap(), 2);

        let grayed = gray(&codec, &holey).unwrap();
        let pages = crate::fumen::FumenCodec::decode(&codec, &grayed).unwrap();
        assert_eq!(pages[0].field.as_ref().unwrap().rows(), vec!["XXX_______", "XXXXXXXXXX"]);
    }
}

#[cfg(test)]
mod reader_tests {
    use pretty_assertions::assert_eq;

    use crate::config::SavesConfig;
    use crate::error::{DataError, Error};
    use crate::fumen::Fumen;
    use crate::reader::SavesReader;
    use crate::tests::support::{queues, MemoryCodec};

    const TABLE: &str = "ツモ,対応地形数,使用ミノ,未使用ミノ,テト譜
TILJSZO,2,ILJSZO;TLJSZO,T;I,A;X
ITLJSZO,0,,,
";

    fn config() -> SavesConfig {
        SavesConfig::new("IJLO", "TILJSZO", 1)
    }

    #[test]
    fn saves_include_unseen_last_bag() {
        let reader = SavesReader::from_text(config(), TABLE).unwrap();
        let rows = reader.read().collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].solveable);
        assert_eq!(rows[0].saves, queues(&["TTIL", "TIIL"]));
        assert_eq!(rows[0].fumens, None);
        assert!(!rows[1].solveable);
        assert!(rows[1].saves.is_empty());
    }

    #[test]
    fn fumens_follow_comment_checksum() {
        let codec = MemoryCodec::with_comments(&[("A", "ILJSZO"), ("X", "TLJSZO")]);
        let reader = SavesReader::from_text(config(), TABLE).unwrap();
        let rows = reader.read_with_fumens(&codec).with_lines().collect::<Result<Vec<_>, _>>().unwrap();

        assert_eq!(rows[0].fumens, Some(vec![vec![Fumen::from("A")], vec![Fumen::from("X")]]));
        assert_eq!(rows[1].fumens, Some(vec![]));
        assert_eq!(rows[0].line.as_ref().and_then(|line| line.get(0)), Some("TILJSZO"));
    }

    #[test]
    fn checksum_wraps_like_a_code_unit() {
        // sums to 66011, which leaves 'T' once the difference wraps around 2^16
        let codec = MemoryCodec::with_comments(&[("A", "\u{FFFF}ILJSZO\u{1}"), ("X", "TLJSZO")]);
        let reader = SavesReader::from_text(config(), TABLE).unwrap();
        let rows = reader.read_with_fumens(&codec).collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(rows[0].fumens, Some(vec![vec![Fumen::from("A")], vec![Fumen::from("X")]]));
    }

    #[test]
    fn unsolvable_rows_still_need_a_valid_queue() {
        let table = "ツモ,未使用ミノ,テト譜\nTILJSZX,,\nTILJSZO,T,A\n";
        let reader = SavesReader::from_text(config(), table).unwrap();
        let mut rows = reader.read();
        assert!(matches!(rows.next(), Some(Err(Error::Data(DataError::InvalidQueue { record: 1, .. })))));
        assert!(rows.next().is_none());
    }

    #[test]
    fn reading_restarts() {
        let reader = SavesReader::from_text(config(), TABLE).unwrap();
        let first = reader.read().collect::<Result<Vec<_>, _>>().unwrap();
        let second = reader.read().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_columns_are_named() {
        let result = SavesReader::from_text(config(), "ツモ,テト譜\nTILJSZO,A\n");
        match result {
            Err(Error::Data(DataError::MissingColumns(columns))) => assert_eq!(columns, vec!["未使用ミノ"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn short_build_ends_the_stream() {
        let reader = SavesReader::from_text(SavesConfig::new("IJ", "TILJSZO", 1), TABLE).unwrap();
        let mut rows = reader.read();
        assert!(matches!(rows.next(), Some(Err(Error::Data(DataError::QueueLength { length: 9, lines: 4, .. })))));
        assert!(rows.next().is_none());
    }

    #[test]
    fn two_line_accepts_half_queues() {
        let table = "ツモ,未使用ミノ,テト譜\nTIL,O,A\n";
        let config = SavesConfig::new("SZ", "TILJSZO", 1).twoline(true);
        let rows = SavesReader::from_text(config, table).unwrap().read().collect::<Result<Vec<_>, _>>().unwrap();
        assert!(rows[0].solveable);
        assert_eq!(rows[0].saves.len(), 1);
    }

    #[test]
    fn bad_pieces_are_reported() {
        let table = "ツモ,未使用ミノ,テト譜\nTILJSZX,T,A\n";
        let reader = SavesReader::from_text(config(), table).unwrap();
        assert!(matches!(reader.read().next(), Some(Err(Error::Data(DataError::InvalidQueue { record: 1, .. })))));
        assert!(matches!(SavesReader::from_text(SavesConfig::new("IJLO", "TILJSZO", 0), TABLE), Err(Error::Data(DataError::PcNumber(0)))));
    }
}

#[cfg(test)]
mod coverage_tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use varisat::{ExtendFormula, Lit, Solver, Var};

    use crate::coverage::{CoverageGraph, PathRow};
    use crate::fraction::Fraction;
    use crate::fumen::Fumen;
    use crate::logic::at_most;
    use crate::minimal::{minimal_sets, search, HittingSet};
    use crate::filter::rank;
    use crate::error::CoverageError;
    use std::sync::atomic::AtomicBool;
    use std::time::{Duration, Instant};

    fn row(pattern: &str, fumens: &[&str]) -> PathRow {
        PathRow { pattern: pattern.parse().unwrap(), fumens: fumens.iter().map(|f| Fumen::from(*f)).collect() }
    }

    #[test]
    fn graph_shape() {
        let graph = CoverageGraph::from_rows(&[row("TI", &["A"]), row("IT", &["A"]), row("TO", &["B"]), row("OT", &[])]);
        assert_eq!(graph.patterns().len(), 3);
        assert_eq!(graph.solutions(), &[Fumen::from("A"), Fumen::from("B")]);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.components().len(), 2);
        assert_eq!(graph.covered_by(0), vec![0, 1]);
        assert_eq!(graph.covering(2), vec![1]);
        assert!(graph.covers(&[0, 1]));
        assert!(!graph.covers(&[0]));
    }

    #[test]
    fn forced_solutions_rank_by_gain() {
        let graph = CoverageGraph::from_rows(&[row("TI", &["A"]), row("IT", &["A"]), row("TO", &["B"])]);
        let sets = minimal_sets(&graph, 16, Duration::from_secs(60)).unwrap();
        assert_eq!(sets, vec![vec![0, 1]]);

        assert_eq!(rank(&graph, &[1, 0], 3).unwrap(), vec![
            (0, Fraction::new(2, 3).unwrap()),
            (1, Fraction::new(3, 3).unwrap()),
        ]);
    }

    #[test]
    fn dominated_solutions_are_skipped() {
        let graph = CoverageGraph::from_rows(&[row("TI", &["A", "C"]), row("IT", &["A"]), row("TO", &["A", "B"])]);
        assert_eq!(minimal_sets(&graph, 16, Duration::from_secs(60)).unwrap(), vec![vec![0]]);
    }

    #[test]
    fn enumerates_every_minimum_cover_of_a_cycle() {
        let graph = CoverageGraph::from_rows(&[row("T", &["A", "C"]), row("I", &["A", "B"]), row("O", &["B", "C"])]);
        let sets = minimal_sets(&graph, 16, Duration::from_secs(60)).unwrap();
        assert_eq!(sets.len(), 3);
        for set in &sets {
            assert_eq!(set.len(), 2);
            assert!(graph.covers(set));
        }
        assert_eq!(minimal_sets(&graph, 1, Duration::from_secs(60)).unwrap().len(), 1);
    }

    #[test]
    fn cardinality_bound() {
        for k in 0..=4 {
            for assignment in 0..16u32 {
                let vars = (0..4).map(|index| Var::from_index(index).positive()).collect::<Vec<Lit>>();
                let mut next = 4;
                let clauses = at_most(&vars, k, || {
                    next += 1;
                    Var::from_index(next - 1)
                });

                let mut solver = Solver::new();
                for clause in &clauses {
                    solver.add_clause(clause);
                }
                for bit in 0..4 {
                    solver.add_clause(&[vars[bit].var().lit(assignment & (1 << bit) != 0)]);
                }
                assert_eq!(solver.solve().unwrap(), assignment.count_ones() as usize <= k, "k = {k}, assignment = {assignment:04b}");
            }
        }
    }

    fn brute_force_minimum(graph: &CoverageGraph) -> usize {
        let count = graph.solutions().len();
        (0..1u32 << count)
            .map(|mask| (0..count).filter(|s| mask & (1 << s) != 0).collect::<Vec<_>>())
            .filter(|set| graph.covers(set))
            .map(|set| set.len())
            .min()
            .unwrap()
    }

    // 40 solutions, each row hit by three of them spread over the range
    fn scattered_graph() -> CoverageGraph {
        let names = (0..40).map(|index| format!("S{index}")).collect::<Vec<_>>();
        let rows = (0..120usize)
            .map(|i| {
                let hits = [(i * 7) % 40, (i * 13 + 5) % 40, (i * 29 + 11) % 40];
                row("TIL", &hits.iter().map(|hit| names[*hit].as_str()).collect::<Vec<_>>())
            })
            .collect::<Vec<_>>();
        CoverageGraph::from_rows(&rows)
    }

    #[test]
    fn spent_budget_times_out() {
        let graph = CoverageGraph::from_rows(&[row("TI", &["A"]), row("TO", &["B"])]);
        assert_eq!(minimal_sets(&graph, 16, Duration::ZERO), Err(CoverageError::TimedOut));
    }

    #[test]
    fn cancelled_search_makes_no_solver_call() {
        let requirements = vec![vec![0, 1], vec![1, 2]];
        assert_eq!(search(3, &requirements, 1..=2, 4, &AtomicBool::new(true)), Err(CoverageError::TimedOut));
        assert_eq!(search(3, &requirements, 1..=2, 1, &AtomicBool::new(false)), Ok(vec![vec![1]]));
    }

    #[test]
    fn timed_out_worker_stops() {
        let graph = scattered_graph();
        let component = graph.components().into_iter().next().unwrap();
        let problem = HittingSet::reduce(&graph, &component);

        let mut worker = None;
        let result = problem.solve_with(64, Instant::now(), |handle| worker = Some(handle));
        assert_eq!(result, Err(CoverageError::TimedOut));

        let worker = worker.unwrap();
        let stopped = Instant::now();
        while !worker.is_finished() {
            assert!(stopped.elapsed() < Duration::from_secs(30), "search worker kept running");
            std::thread::sleep(Duration::from_millis(10));
        }
        worker.join().unwrap();
    }

    proptest! {
        #[test]
        fn exact_search_finds_the_minimum(rows in prop::collection::vec(prop::collection::btree_set(0..6u8, 1..4), 1..8)) {
            let names = ["A", "B", "C", "D", "E", "F"];
            let path_rows = rows.iter()
                .map(|fumens| row("T", &fumens.iter().map(|f| names[*f as usize]).collect::<Vec<_>>()))
                .collect::<Vec<_>>();
            let graph = CoverageGraph::from_rows(&path_rows);
            let sets = minimal_sets(&graph, 4, Duration::from_secs(60)).unwrap();
            let minimum = brute_force_minimum(&graph);
            for set in &sets {
                prop_assert!(graph.covers(set));
                prop_assert_eq!(set.len(), minimum);
            }
        }
    }
}

#[cfg(test)]
mod heuristic_tests {
    use std::path::PathBuf;

    use crate::config::PathFilterConfig;
    use crate::coverage::PathRow;
    use crate::error::CoverageError;
    use crate::fumen::Fumen;
    use crate::heuristic::{CoverHeuristic, PathFilter};

    fn path_filter(work_dir: PathBuf) -> PathFilter {
        PathFilter::new(PathFilterConfig {
            java: PathBuf::from("pcsaves-no-such-java"),
            work_dir,
            ..PathFilterConfig::default()
        })
    }

    #[test]
    fn runs_get_their_own_files() {
        let work_dir = tempfile::tempdir().unwrap();
        let filter = path_filter(work_dir.path().to_path_buf());

        let first = filter.run_files().unwrap();
        let second = filter.run_files().unwrap();
        assert_ne!(first.csv, second.csv);
        assert_ne!(first.output, second.output);
        assert!(first.csv.starts_with(work_dir.path()));

        let dir = first.dir.path().to_path_buf();
        drop(first);
        assert!(!dir.exists());
        assert!(second.dir.path().exists());
    }

    #[test]
    fn failed_run_leaves_nothing_behind() {
        let work_dir = tempfile::tempdir().unwrap();
        let filter = path_filter(work_dir.path().to_path_buf());
        let rows = [PathRow { pattern: "TILJSZO".parse().unwrap(), fumens: vec![Fumen::from("A")] }];

        assert!(matches!(filter.candidate(&rows), Err(CoverageError::Heuristic(_))));
        assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
    }
}
