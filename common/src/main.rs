use sweeper::*;
use std::thread;
use std::time::Duration;

fn main() {
    // --- 1. Initialization ---
    let mut game = Game::new(8, 8, 8);
    let mut solver = Solver::new(game.width, game.height);

    println!("--- Autonomous Minesweeper Bot ---");
    println!("Strategy: Play deduced-safe cells, guess randomly otherwise.");
    println!("Initial Board:");
    print_board(&game);
    thread::sleep(Duration::from_secs(1));

    // --- 2. Game Loop ---
    let mut move_count = 0;
    while game.game_state == GameState::Playing {
        move_count += 1;
        println!("\n--- Move #{} ---", move_count);

        // Flag every cell the solver has proven to be a mine. Flagging all
        // of them wins the game without probing the rest of the board.
        for mine in solver.known_mines().iter().copied().collect::<Vec<_>>() {
            if !game.is_flagged(mine) {
                println!("Flagging deduced mine at ({}, {}).", mine.x, mine.y);
                game.flag(mine);
            }
        }
        if game.game_state != GameState::Playing {
            break;
        }

        // --- 3. Bot's Decision Logic ---

        // Strategy 1: A cell the knowledge base proves safe.
        let point_to_reveal = if let Some(point) = solver.pick_safe_move() {
            println!("Logic found a guaranteed safe cell.");
            Some(point)
        } else {
            // Strategy 2: No safe move known, so make a random guess among
            // cells that are at least not proven mines.
            println!("No logically safe move known. Making a random guess...");
            solver.pick_random_move()
        };

        // --- 4. Execute the Chosen Move ---
        let Some(point) = point_to_reveal else {
            // Exhaustion: nothing left that could possibly be probed.
            println!("No valid moves left for the bot to make.");
            break;
        };

        println!("Bot reveals ({}, {})...", point.x, point.y);
        match game.reveal_cell(point).unwrap() {
            Some(count) => solver.observe(point, count as usize),
            None => println!("That was a mine."),
        }

        print_board(&game);

        // Add a delay to make the game watchable
        thread::sleep(Duration::from_millis(300));
    }

    // --- 5. Final Result ---
    println!("\n--- Game Over ---");

    match game.game_state {
        GameState::Won => println!("Result: The bot won!"),
        GameState::Lost => println!("Result: The bot hit a mine and lost."),
        GameState::Playing => println!("Result: The game ended unexpectedly."),
    }
}

fn print_board(game: &Game) {
    // Print header
    print!("   ");
    for x in 0..game.width {
        print!("{:^3}", x);
    }
    println!("\n  +{}", "---".repeat(game.width));

    // Print rows
    for (y, row) in game.board.iter().enumerate() {
        print!("{:^2}|", y);
        for (x, cell) in row.iter().enumerate() {
            let display = match cell {
                Cell::Hidden if game.is_flagged(Point { x, y }) => " F ".to_string(),
                Cell::Hidden => " ■ ".to_string(),
                Cell::Revealed(n) => format!(" {} ", n),
            };
            print!("{}", display);
        }
        println!();
    }
    println!();
}
