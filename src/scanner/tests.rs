// Copyright (c) 2026 Redglyph (@gmail.com). All Rights Reserved.

#![cfg(test)]

use std::cell::RefCell;
use crate::char_iter::Pos;
use crate::{ClassId, CollectJoin, StateId, TokenTypeId};
use super::*;

fn state(transitions: Vec<Option<StateId>>, accepts: Vec<AcceptData>) -> DfaState {
    DfaState { transitions, accepts }
}

fn accept(token_type: TokenTypeId, priority: u32) -> AcceptData {
    AcceptData { token_type, priority, lookahead: Lookahead::None }
}

fn single_mode(dfa: Vec<DfaState>) -> Vec<ScannerMode> {
    vec![ScannerMode::new("INITIAL", dfa, vec![])]
}

// ---------------------------------------------------------------------------------------------

mod matching {
    use super::*;

    fn a_classify(c: char) -> Option<ClassId> {
        if c == 'a' { Some(0) } else { None }
    }

    #[test]
    fn single_char() {
        let modes = single_mode(vec![
            state(vec![Some(1)], vec![]),
            state(vec![None], vec![accept(1, 0)]),
        ]);
        let matches = find_matches("a", a_classify, &modes).to_vec();
        assert_eq!(matches, vec![Match {
            span: Span::new(0, 1),
            token_type: 1,
            positions: Positions::new(Pos(1, 1), Pos(1, 2)),
        }]);
    }

    #[test]
    fn maximal_munch() {
        // accepts both "a" (type 1) and "aa" (type 2); the longer match must win
        let modes = single_mode(vec![
            state(vec![Some(1)], vec![]),
            state(vec![Some(2)], vec![accept(1, 0)]),
            state(vec![None], vec![accept(2, 0)]),
        ]);
        let tests = vec![
            // id, input, expected (token type, span)
            (0, "a",   vec![(1, Span::new(0, 1))]),
            (1, "aa",  vec![(2, Span::new(0, 2))]),
            (2, "aaa", vec![(2, Span::new(0, 2)), (1, Span::new(2, 3))]),
        ];
        for (id, input, expected) in tests {
            let result = find_matches(input, a_classify, &modes)
                .map(|m| (m.token_type, m.span))
                .to_vec();
            assert_eq!(result, expected, "test {id} failed");
        }
    }

    #[test]
    fn accept_list_order_wins_on_equal_length() {
        // two accepts on the same state: the first satisfied entry is taken, whatever
        // its priority value
        let modes = single_mode(vec![
            state(vec![Some(1)], vec![]),
            state(vec![None], vec![accept(5, 1), accept(7, 0)]),
        ]);
        let matches = find_matches("a", a_classify, &modes).to_vec();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].token_type, 5);
    }

    #[test]
    fn candidate_comparison() {
        // rule used when two candidates of different loop iterations are compared:
        // longer span first, then smaller priority value on equal length
        assert!(better_candidate(1, 5, None));
        assert!(better_candidate(3, 9, Some((2, 0))));
        assert!(!better_candidate(2, 0, Some((3, 9))));
        assert!(better_candidate(2, 1, Some((2, 2))));
        assert!(!better_candidate(2, 2, Some((2, 1))));
        assert!(!better_candidate(2, 1, Some((2, 1))));
    }

    #[test]
    fn unrecognized_chars_are_skipped() {
        let modes = single_mode(vec![
            state(vec![Some(1)], vec![]),
            state(vec![None], vec![accept(5, 0)]),
        ]);
        let spans = find_matches("a!!a", a_classify, &modes).map(|m| m.span).to_vec();
        assert_eq!(spans, vec![Span::new(0, 1), Span::new(3, 4)]);
        // only gaps remain when nothing is recognized
        assert_eq!(find_matches("!!", a_classify, &modes).count(), 0);
        // spans are ordered and disjoint
        for w in spans.windows(2) {
            assert!(w[1].start >= w[0].end);
        }
    }

    #[test]
    fn multibyte_char() {
        let classify = |c: char| if c == '©' { Some(0) } else { None };
        let modes = single_mode(vec![
            state(vec![Some(1)], vec![]),
            state(vec![None], vec![accept(5, 0)]),
        ]);
        let matches = find_matches("©©", classify, &modes).to_vec();
        assert_eq!(matches.iter().map(|m| m.span).to_vec(), vec![Span::new(0, 2), Span::new(2, 4)]);
        assert_eq!(matches[1].positions, Positions::new(Pos(1, 2), Pos(1, 3)));
    }

    #[test]
    fn newline_positions() {
        let classify = |c: char| match c {
            'a' => Some(0),
            '\n' => Some(1),
            _ => None,
        };
        let modes = single_mode(vec![
            state(vec![Some(1), Some(2)], vec![]),
            state(vec![None, None], vec![accept(5, 0)]),
            state(vec![None, None], vec![accept(6, 0)]),
        ]);
        let positions = find_matches("a\na", classify, &modes).map(|m| m.positions).to_vec();
        assert_eq!(positions, vec![
            Positions::new(Pos(1, 1), Pos(1, 2)),
            // a trailing newline wraps the end position to the next line
            Positions::new(Pos(1, 2), Pos(2, 1)),
            Positions::new(Pos(2, 1), Pos(2, 2)),
        ]);
    }
}

// ---------------------------------------------------------------------------------------------

mod lookahead {
    use super::*;

    fn ab_classify(c: char) -> Option<ClassId> {
        match c {
            'a' => Some(0),
            'b' => Some(1),
            _ => None,
        }
    }

    fn sub_accepting_b() -> Vec<DfaState> {
        vec![
            state(vec![None, Some(1)], vec![]),
            state(vec![None, None], vec![accept(1, 0)]),
        ]
    }

    fn modes_with(lookahead: Lookahead) -> Vec<ScannerMode> {
        single_mode(vec![
            state(vec![Some(1), None], vec![]),
            state(vec![None, None], vec![AcceptData { token_type: 1, priority: 0, lookahead }]),
        ])
    }

    #[test]
    fn negative() {
        let modes = modes_with(Lookahead::Negative(sub_accepting_b()));
        // "ab": the sub-DFA matches after 'a', so no match starts and the progress
        // skip consumes 'a', then 'b'
        assert_eq!(find_matches("ab", ab_classify, &modes).count(), 0);
        let matches = find_matches("ac", ab_classify, &modes).to_vec();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].span, Span::new(0, 1));
        assert_eq!(matches[0].token_type, 1);
    }

    #[test]
    fn positive() {
        let modes = modes_with(Lookahead::Positive(sub_accepting_b()));
        let matches = find_matches("ab", ab_classify, &modes).to_vec();
        // lookahead is zero-width: the match stops before 'b', which then starts no
        // match of its own
        assert_eq!(matches, vec![Match {
            span: Span::new(0, 1),
            token_type: 1,
            positions: Positions::new(Pos(1, 1), Pos(1, 2)),
        }]);
        assert_eq!(find_matches("ac", ab_classify, &modes).count(), 0);
    }

    #[test]
    fn lookahead_falls_back_to_next_accept() {
        // first accept requires 'b' to follow, second takes over otherwise
        let modes = single_mode(vec![
            state(vec![Some(1), None], vec![]),
            state(vec![None, None], vec![
                AcceptData { token_type: 3, priority: 0, lookahead: Lookahead::Positive(sub_accepting_b()) },
                accept(4, 0),
            ]),
        ]);
        let types = find_matches("ab", ab_classify, &modes).map(|m| m.token_type).to_vec();
        assert_eq!(types, vec![3]);
        let types = find_matches("ac", ab_classify, &modes).map(|m| m.token_type).to_vec();
        assert_eq!(types, vec![4]);
    }
}

// ---------------------------------------------------------------------------------------------

mod facade {
    use super::*;

    fn wxyz_classify(c: char) -> Option<ClassId> {
        match c {
            'w' => Some(0),
            'x' => Some(1),
            'y' => Some(2),
            'z' => Some(3),
            _ => None,
        }
    }

    fn wxyz_modes() -> Vec<ScannerMode> {
        // w x y z -> token types 1 5 3 7
        single_mode(vec![
            state(vec![Some(1), Some(2), Some(3), Some(4)], vec![]),
            state(vec![None; 4], vec![accept(1, 0)]),
            state(vec![None; 4], vec![accept(5, 0)]),
            state(vec![None; 4], vec![accept(3, 0)]),
            state(vec![None; 4], vec![accept(7, 0)]),
        ])
    }

    #[test]
    fn trivia_filtering() {
        let modes = wxyz_modes();
        let tokens = scan("wxyz", "test", wxyz_classify, &modes).to_vec();
        assert_eq!(tokens.iter().map(|t| t.token_type).to_vec(), vec![5, 7]);
        assert_eq!(tokens.iter().map(|t| t.text.as_str()).to_vec(), vec!["x", "z"]);
    }

    #[test]
    fn trivia_override() {
        let modes = wxyz_modes();
        let types = scan("wxyz", "test", wxyz_classify, &modes)
            .set_trivia_types(vec![5])
            .map(|t| t.token_type)
            .to_vec();
        assert_eq!(types, vec![1, 3, 7]);
    }

    #[test]
    fn split_trivia() {
        let dropped = RefCell::new(Vec::new());
        let modes = wxyz_modes();
        let kept = scan("wxyz", "test", wxyz_classify, &modes)
            .split_trivia(|token| dropped.borrow_mut().push(token.token_type))
            .map(|t| t.token_type)
            .to_vec();
        assert_eq!(kept, vec![5, 7]);
        assert_eq!(dropped.into_inner(), vec![1, 3]);
    }
}

// ---------------------------------------------------------------------------------------------

mod modes {
    use super::*;

    #[test]
    fn context_transitions() {
        let modes = vec![
            ScannerMode::new("INITIAL", vec![], vec![
                (1, ModeAction::PushMode(1)),
                (2, ModeAction::SetMode(1)),
                (3, ModeAction::PopMode),
            ]),
            ScannerMode::new("OTHER", vec![], vec![(4, ModeAction::PopMode)]),
        ];
        let mut context = ScannerContext::new(&modes);
        assert_eq!(context.current_mode(), 0);
        context.handle_mode_transition(99);     // no transition for this token
        assert_eq!(context.current_mode(), 0);
        context.handle_mode_transition(3);      // pop on empty stack is ignored
        assert_eq!(context.current_mode(), 0);
        context.handle_mode_transition(1);
        assert_eq!(context.current_mode(), 1);
        assert_eq!(context.current_mode_name(), "OTHER");
        context.handle_mode_transition(4);
        assert_eq!(context.current_mode(), 0);
        context.handle_mode_transition(2);
        assert_eq!(context.current_mode(), 1);
        context.handle_mode_transition(4);      // stack is empty again after a plain set
        assert_eq!(context.current_mode(), 1);
    }

    #[test]
    fn string_mode_scan() {
        // mode 0: 'i'+ identifiers (type 5) and the '"' delimiter (type 10, push);
        // mode 1: 's'+ content (type 6) and the closing '"' (type 11, pop)
        let classify = |c: char| match c {
            '"' => Some(0),
            'i' => Some(1),
            's' => Some(2),
            _ => None,
        };
        let modes = vec![
            ScannerMode::new(
                "INITIAL",
                vec![
                    state(vec![Some(1), Some(2), None], vec![]),
                    state(vec![None; 3], vec![accept(10, 0)]),
                    state(vec![None, Some(2), None], vec![accept(5, 0)]),
                ],
                vec![(10, ModeAction::PushMode(1))],
            ),
            ScannerMode::new(
                "STRING",
                vec![
                    state(vec![Some(1), None, Some(2)], vec![]),
                    state(vec![None; 3], vec![accept(11, 0)]),
                    state(vec![None, None, Some(2)], vec![accept(6, 0)]),
                ],
                vec![(11, ModeAction::PopMode)],
            ),
        ];
        let mut finder = find_matches(r#"ii"ss"i"#, classify, &modes);
        let mut types = Vec::new();
        while let Some(m) = finder.next() {
            types.push(m.token_type);
        }
        assert_eq!(types, vec![5, 10, 6, 11, 5]);
        assert_eq!(finder.context().current_mode(), 0);
    }
}
