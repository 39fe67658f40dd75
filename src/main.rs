fn main() {
    println!("Kierki - networked four-player trick-taking tournament");
    println!();
    println!("Usage:");
    println!("  Start the server:   cargo run --bin kierki-server -- -p 7878 -f deals.txt");
    println!("  Connect a client:   cargo run --bin kierki-client -- -h 127.0.0.1 -p 7878 -N");
    println!();
    println!("Run four clients, one per seat (N, E, S, W), to start a tournament.");
}
